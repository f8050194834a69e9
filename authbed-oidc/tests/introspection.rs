use authbed_oidc::{ApiResource, Client, IssuerHandle, TestUser, TokenIssuer};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn start_issuer() -> IssuerHandle {
    TokenIssuer::default()
        .with_clients(vec![Client::new("client")
            .with_secret("secret")
            .with_scopes(["openid", "profile", "api"])])
        .with_users(vec![TestUser::new("2", "admin", "adminPassword")
            .with_claim("name", "Admin")
            .with_claim("role", "admin")])
        .with_api_resource(ApiResource::new("api").with_secret("secret"))
        .with_scope_claims(["role"])
        .start()
        .unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn access_token(issuer: &IssuerHandle, scope: &str) -> String {
    let resp = issuer
        .router()
        .oneshot(form(
            "/connect/token",
            &format!(
                "grant_type=password&username=admin&password=adminPassword&client_id=client&client_secret=secret&scope={scope}"
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn introspect(issuer: &IssuerHandle, token: &str) -> (StatusCode, Value) {
    let resp = issuer
        .router()
        .oneshot(form(
            "/connect/introspect",
            &format!("token={token}&client_id=api&client_secret=secret"),
        ))
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

#[tokio::test]
async fn active_token_returns_its_claims() {
    let issuer = start_issuer();
    let token = access_token(&issuer, "openid%20api").await;

    let (status, json) = introspect(&issuer, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], true);
    assert_eq!(json["sub"], "2");
    assert_eq!(json["role"], "admin");
    assert_eq!(json["client_id"], "client");
    assert_eq!(json["scope"], "openid api");
    assert_eq!(json["iss"], "http://localhost");
}

#[tokio::test]
async fn basic_api_authentication() {
    let issuer = start_issuer();
    let token = access_token(&issuer, "api").await;
    let req = Request::builder()
        .method("POST")
        .uri("/connect/introspect")
        .header("content-type", "application/x-www-form-urlencoded")
        // api:secret
        .header(header::AUTHORIZATION, "Basic YXBpOnNlY3JldA==")
        .body(Body::from(format!("token={token}")))
        .unwrap();
    let resp = issuer.router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["active"], true);
}

#[tokio::test]
async fn wrong_api_secret_is_rejected() {
    let issuer = start_issuer();
    let token = access_token(&issuer, "api").await;
    let resp = issuer
        .router()
        .oneshot(form(
            "/connect/introspect",
            &format!("token={token}&client_id=api&client_secret=nope"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "invalid_client");
}

#[tokio::test]
async fn missing_token_is_invalid_request() {
    let issuer = start_issuer();
    let resp = issuer
        .router()
        .oneshot(form("/connect/introspect", "client_id=api&client_secret=secret"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "invalid_request");
}

#[tokio::test]
async fn garbage_is_inactive() {
    let issuer = start_issuer();
    let (status, json) = introspect(&issuer, "not-a-jwt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "active": false }));
}

#[tokio::test]
async fn token_from_another_issuer_is_inactive() {
    let issuer = start_issuer();
    let foreign = start_issuer();
    let token = access_token(&foreign, "api").await;

    let (_, json) = introspect(&issuer, &token).await;
    assert_eq!(json, json!({ "active": false }));
}

#[tokio::test]
async fn expired_token_is_inactive() {
    let issuer = start_issuer();
    let token = issuer
        .sign_claims(&json!({
            "iss": "http://localhost",
            "aud": "api",
            "sub": "2",
            "scope": ["api"],
            "iat": 1_000_000,
            "nbf": 1_000_000,
            "exp": 1_000_060,
        }))
        .unwrap();

    let (_, json) = introspect(&issuer, &token).await;
    assert_eq!(json["active"], false);
}

#[tokio::test]
async fn token_without_api_audience_is_inactive() {
    let issuer = start_issuer();
    let token = access_token(&issuer, "openid").await;

    let (_, json) = introspect(&issuer, &token).await;
    assert_eq!(json["active"], false);
}
