use std::sync::Arc;

use authbed_security::{
    enforce_policy, AuthenticatedUser, AuthorizationPolicy, ClaimsValidator, PolicyGate,
    SecurityConfig,
};
use axum::body::Body;
use axum::extract::Extension;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::routing::{delete, get, post, MethodRouter};
use axum::{Json, Router};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &[u8] = b"policy-secret";

fn validator() -> Arc<ClaimsValidator> {
    let config =
        SecurityConfig::new("http://issuer.test", "api").with_allowed_algorithm(Algorithm::HS256);
    Arc::new(ClaimsValidator::new_with_static_key(
        DecodingKey::from_secret(SECRET),
        config,
    ))
}

fn token(sub: &str, role: Option<&str>) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let mut claims = json!({
        "sub": sub,
        "iss": "http://issuer.test",
        "aud": "api",
        "exp": now + 600,
    });
    if let Some(role) = role {
        claims["role"] = json!(role);
    }
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> Json<Value> {
    Json(json!({ "sub": user.sub }))
}

fn guarded(policy: AuthorizationPolicy, route: MethodRouter) -> MethodRouter {
    route.route_layer(middleware::from_fn_with_state(
        PolicyGate::new(validator(), policy),
        enforce_policy,
    ))
}

fn app() -> Router {
    Router::new()
        .route("/open", guarded(AuthorizationPolicy::Anonymous, get(|| async { "open" })))
        .route("/private", guarded(AuthorizationPolicy::Authenticated, post(whoami)))
        .route("/admin", guarded(AuthorizationPolicy::Roles(&["admin"]), delete(whoami)))
}

async fn send(method: &str, uri: &str, bearer: Option<&str>) -> (StatusCode, Option<String>, Vec<u8>) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(value) = bearer {
        req = req.header(AUTHORIZATION, value);
    }
    let resp = app()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let challenge = resp
        .headers()
        .get(WWW_AUTHENTICATE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, challenge, body)
}

// ── Anonymous ──

#[tokio::test]
async fn anonymous_route_needs_no_token() {
    let (status, _, body) = send("GET", "/open", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"open");
}

#[tokio::test]
async fn anonymous_route_ignores_garbage_authorization() {
    let (status, _, _) = send("GET", "/open", Some("Bearer not-a-token")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send("GET", "/open", Some("Basic Zm9vOmJhcg==")).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Authenticated ──

#[tokio::test]
async fn authenticated_route_without_token_is_401_with_challenge() {
    let (status, challenge, body) = send("POST", "/private", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(challenge.as_deref(), Some("Bearer"));
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn authenticated_route_rejects_invalid_token() {
    let (status, _, _) = send("POST", "/private", Some("Bearer garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticated_route_rejects_wrong_scheme() {
    let t = token("1", None);
    let (status, _, _) = send("POST", "/private", Some(&format!("Token {t}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticated_route_passes_identity_to_handler() {
    let t = token("1", None);
    let (status, _, body) = send("POST", "/private", Some(&format!("Bearer {t}"))).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["sub"], "1");
}

// ── Roles ──

#[tokio::test]
async fn role_route_without_token_is_401() {
    let (status, _, _) = send("DELETE", "/admin", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_route_without_role_is_403() {
    let t = token("1", None);
    let (status, challenge, _) = send("DELETE", "/admin", Some(&format!("Bearer {t}"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(challenge.is_none());
}

#[tokio::test]
async fn role_route_with_other_role_is_403() {
    let t = token("1", Some("auditor"));
    let (status, _, _) = send("DELETE", "/admin", Some(&format!("Bearer {t}"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_route_with_role_is_200() {
    let t = token("2", Some("admin"));
    let (status, _, _) = send("DELETE", "/admin", Some(&format!("bearer {t}"))).await;
    assert_eq!(status, StatusCode::OK);
}
