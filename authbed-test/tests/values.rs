//! The authorization matrix of the values API, driven through the harness.

use authbed_test::{Harness, HarnessConfig, ValidationMode};
use serde_json::json;

fn config(validation: ValidationMode) -> HarnessConfig {
    HarnessConfig {
        validation,
        ..HarnessConfig::default()
    }
}

async fn harness(config: HarnessConfig) -> Harness {
    Harness::with_config(config).await.unwrap()
}

async fn anonymous_get_is_ok(config: HarnessConfig) {
    let harness = harness(config).await;
    harness
        .api()
        .get("/api/values")
        .send()
        .await
        .assert_ok()
        .assert_json_path("len()", 2)
        .assert_json_path("[0].value", "value1");
}

async fn unauthenticated_post_is_unauthorized(config: HarnessConfig) {
    let harness = harness(config).await;
    harness
        .api()
        .post("/api/values")
        .json(&json!({ "value": "value3" }))
        .send()
        .await
        .assert_unauthorized()
        .assert_header("www-authenticate", "Bearer");
}

async fn user_post_is_ok(config: HarnessConfig) {
    let mut harness = harness(config).await;
    harness.attach_token("user", "password").await.unwrap();
    harness
        .api()
        .post("/api/values")
        .json(&json!({ "value": "value3" }))
        .send()
        .await
        .assert_ok()
        .assert_json_path("id", 3);
}

async fn user_delete_is_forbidden(config: HarnessConfig) {
    let mut harness = harness(config).await;
    harness.attach_token("user", "password").await.unwrap();
    harness
        .api()
        .delete("/api/values/5")
        .send()
        .await
        .assert_forbidden();
}

async fn admin_delete_is_ok(config: HarnessConfig) {
    let mut harness = harness(config).await;
    harness.attach_token("admin", "adminPassword").await.unwrap();
    harness
        .api()
        .delete("/api/values/5")
        .send()
        .await
        .assert_ok();
}

// ── JWT validation ──

#[tokio::test]
async fn jwt_anonymous_get_is_ok() {
    anonymous_get_is_ok(config(ValidationMode::Jwt)).await;
}

#[tokio::test]
async fn jwt_unauthenticated_post_is_unauthorized() {
    unauthenticated_post_is_unauthorized(config(ValidationMode::Jwt)).await;
}

#[tokio::test]
async fn jwt_user_post_is_ok() {
    user_post_is_ok(config(ValidationMode::Jwt)).await;
}

#[tokio::test]
async fn jwt_user_delete_is_forbidden() {
    user_delete_is_forbidden(config(ValidationMode::Jwt)).await;
}

#[tokio::test]
async fn jwt_admin_delete_is_ok() {
    admin_delete_is_ok(config(ValidationMode::Jwt)).await;
}

// ── Introspection ──

#[tokio::test]
async fn introspection_anonymous_get_is_ok() {
    anonymous_get_is_ok(config(ValidationMode::Introspection)).await;
}

#[tokio::test]
async fn introspection_unauthenticated_post_is_unauthorized() {
    unauthenticated_post_is_unauthorized(config(ValidationMode::Introspection)).await;
}

#[tokio::test]
async fn introspection_user_post_is_ok() {
    user_post_is_ok(config(ValidationMode::Introspection)).await;
}

#[tokio::test]
async fn introspection_user_delete_is_forbidden() {
    user_delete_is_forbidden(config(ValidationMode::Introspection)).await;
}

#[tokio::test]
async fn introspection_admin_delete_is_ok() {
    admin_delete_is_ok(config(ValidationMode::Introspection)).await;
}

// ── Non-default API name ──

fn orders() -> HarnessConfig {
    HarnessConfig::for_api("orders")
}

#[tokio::test]
async fn renamed_api_issues_tokens_for_its_own_scope() {
    let harness = harness(orders()).await;
    assert_eq!(harness.issuer().api_name(), "orders");
    harness.get_token("user", "password").await.unwrap();
}

#[tokio::test]
async fn renamed_api_matrix_jwt() {
    anonymous_get_is_ok(orders()).await;
    unauthenticated_post_is_unauthorized(orders()).await;
    user_post_is_ok(orders()).await;
    user_delete_is_forbidden(orders()).await;
    admin_delete_is_ok(orders()).await;
}

#[tokio::test]
async fn renamed_api_matrix_introspection() {
    let config = || HarnessConfig {
        validation: ValidationMode::Introspection,
        ..orders()
    };
    anonymous_get_is_ok(config()).await;
    unauthenticated_post_is_unauthorized(config()).await;
    user_post_is_ok(config()).await;
    user_delete_is_forbidden(config()).await;
    admin_delete_is_ok(config()).await;
}

// ── Request bodies ──

#[tokio::test]
async fn user_post_accepts_raw_text_as_json() {
    let mut harness = harness(config(ValidationMode::Jwt)).await;
    harness.attach_token("user", "password").await.unwrap();
    harness
        .api()
        .post("/api/values")
        .header("content-type", "application/json")
        .body("yeah")
        .send()
        .await
        .assert_ok()
        .assert_json_path("id", 3)
        .assert_json_path("value", "yeah");
}

#[tokio::test]
async fn user_post_accepts_json_string_and_empty_body() {
    let mut harness = harness(config(ValidationMode::Jwt)).await;
    harness.attach_token("user", "password").await.unwrap();
    harness
        .api()
        .post("/api/values")
        .json(&"yeah")
        .send()
        .await
        .assert_ok()
        .assert_json_path("value", "yeah");
    harness
        .api()
        .post("/api/values")
        .send()
        .await
        .assert_ok()
        .assert_json_path("value", "");
}

#[tokio::test]
async fn anonymous_raw_post_is_still_unauthorized() {
    let harness = harness(config(ValidationMode::Jwt)).await;
    harness
        .api()
        .post("/api/values")
        .header("content-type", "application/json")
        .body("yeah")
        .send()
        .await
        .assert_unauthorized();
}

// ── One harness, many steps ──

#[tokio::test]
async fn successive_steps_share_one_harness() {
    let mut harness = Harness::setup().await.unwrap();
    let body = json!({ "value": "value3" });

    harness.api().get("/api/values").send().await.assert_ok();
    harness.api().post("/api/values").json(&body).send().await.assert_unauthorized();

    harness.attach_token("user", "password").await.unwrap();
    harness.api().post("/api/values").json(&body).send().await.assert_ok();
    harness.api().delete("/api/values/5").send().await.assert_forbidden();

    harness.attach_token("admin", "adminPassword").await.unwrap();
    harness.api().delete("/api/values/3").send().await.assert_ok();
    harness.api().get("/api/values/3").send().await.assert_not_found();

    harness.clear_token();
    harness.api().delete("/api/values/1").send().await.assert_unauthorized();
}
