use std::sync::Arc;

use authbed_security::{
    bearer_token_from_headers, extract_bearer_token, AuthenticatedUser, ClaimsValidator,
    SecurityConfig, SecurityError,
};
use axum::body::Body;
use axum::extract::FromRef;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::json;
use tower::ServiceExt;

const SECRET: &[u8] = b"extractor-secret";

#[derive(Clone)]
struct AppState {
    validator: Arc<ClaimsValidator>,
}

impl FromRef<AppState> for Arc<ClaimsValidator> {
    fn from_ref(state: &AppState) -> Self {
        state.validator.clone()
    }
}

fn app() -> Router {
    let config =
        SecurityConfig::new("http://issuer.test", "api").with_allowed_algorithm(Algorithm::HS256);
    let state = AppState {
        validator: Arc::new(ClaimsValidator::new_with_static_key(
            DecodingKey::from_secret(SECRET),
            config,
        )),
    };
    Router::new()
        .route("/me", get(|user: AuthenticatedUser| async move { user.sub }))
        .route(
            "/maybe",
            get(|user: Option<AuthenticatedUser>| async move {
                user.map(|u| u.sub).unwrap_or_else(|| "anonymous".into())
            }),
        )
        .with_state(state)
}

fn token() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    encode(
        &Header::new(Algorithm::HS256),
        &json!({ "sub": "1", "iss": "http://issuer.test", "aud": "api", "exp": now + 600 }),
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap()
}

async fn get_text(uri: &str, auth: Option<String>) -> (StatusCode, String) {
    let mut req = Request::builder().uri(uri);
    if let Some(auth) = auth {
        req = req.header(AUTHORIZATION, auth);
    }
    let resp = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

// ── Header parsing ──

#[test]
fn bearer_scheme_is_case_insensitive() {
    assert_eq!(extract_bearer_token("Bearer abc").unwrap(), "abc");
    assert_eq!(extract_bearer_token("bearer abc").unwrap(), "abc");
    assert_eq!(extract_bearer_token("BEARER abc").unwrap(), "abc");
}

#[test]
fn other_schemes_are_rejected() {
    assert!(matches!(
        extract_bearer_token("Basic abc"),
        Err(SecurityError::InvalidAuthScheme)
    ));
    assert!(matches!(
        extract_bearer_token("Bearer"),
        Err(SecurityError::InvalidAuthScheme)
    ));
}

#[test]
fn missing_header_is_reported() {
    let headers = HeaderMap::new();
    assert!(matches!(
        bearer_token_from_headers(&headers),
        Err(SecurityError::MissingAuthHeader)
    ));
}

#[test]
fn token_is_read_from_headers() {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
    assert_eq!(bearer_token_from_headers(&headers).unwrap(), "xyz");
}

// ── Extractors ──

#[tokio::test]
async fn extractor_accepts_valid_token() {
    let (status, body) = get_text("/me", Some(format!("Bearer {}", token()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1");
}

#[tokio::test]
async fn extractor_rejects_missing_token() {
    let (status, _) = get_text("/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn optional_extractor_without_header_is_none() {
    let (status, body) = get_text("/maybe", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "anonymous");
}

#[tokio::test]
async fn optional_extractor_with_valid_token_is_some() {
    let (status, body) = get_text("/maybe", Some(format!("Bearer {}", token()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "1");
}

#[tokio::test]
async fn optional_extractor_rejects_bad_token() {
    let (status, _) = get_text("/maybe", Some("Bearer nope".into())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
