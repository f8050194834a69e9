//! Tokens carry exactly the user claims the API resource lists.

use authbed_test::{Harness, HarnessConfig};
use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};

const ISSUER_OWNED: &[&str] = &[
    "iss", "sub", "aud", "exp", "nbf", "iat", "jti", "client_id", "scope", "auth_time", "idp",
    "amr",
];

async fn user_claims(harness: &Harness, username: &str, password: &str) -> Map<String, Value> {
    let token = harness.get_token(username, password).await.unwrap();
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&["api"]);
    validation.set_issuer(&[harness.issuer().issuer_uri()]);
    let claims = decode::<Value>(&token, &harness.issuer().decoding_key(), &validation)
        .unwrap()
        .claims;
    let Value::Object(mut claims) = claims else {
        panic!("claims are not an object");
    };
    claims.retain(|name, _| !ISSUER_OWNED.contains(&name.as_str()));
    claims
}

#[tokio::test]
async fn default_scope_claims_release_only_the_role() {
    let harness = Harness::setup().await.unwrap();

    let admin = user_claims(&harness, "admin", "adminPassword").await;
    assert_eq!(Value::Object(admin), serde_json::json!({ "role": "admin" }));

    // `user` has no role claim, so nothing is released.
    let user = user_claims(&harness, "user", "password").await;
    assert!(user.is_empty(), "unexpected claims {user:?}");
}

#[tokio::test]
async fn overridden_scope_claims_are_released() {
    let harness = Harness::with_config(HarnessConfig {
        scope_claims: vec!["name".into(), "website".into(), "email".into()],
        ..HarnessConfig::default()
    })
    .await
    .unwrap();

    let user = user_claims(&harness, "user", "password").await;
    assert_eq!(
        Value::Object(user),
        serde_json::json!({ "name": "User", "website": "https://user.com" })
    );
    let admin = user_claims(&harness, "admin", "adminPassword").await;
    assert_eq!(Value::Object(admin), serde_json::json!({ "name": "Admin" }));
}

#[tokio::test]
async fn subject_matches_the_fixture() {
    let harness = Harness::setup().await.unwrap();
    harness
        .api()
        .get("/api/identity")
        .bearer(&harness.get_token("admin", "adminPassword").await.unwrap())
        .send()
        .await
        .assert_ok()
        .assert_json_path("sub", "2")
        .assert_json_path("roles[0]", "admin");
}
