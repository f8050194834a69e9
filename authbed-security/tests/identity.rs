use authbed_core::Identity;
use authbed_security::openid::extract_claim_values;
use authbed_security::{AuthenticatedUser, ClaimRoleExtractor, RoleExtractor};
use serde_json::json;

#[test]
fn from_claims_reads_standard_fields() {
    let user = AuthenticatedUser::from_claims(json!({
        "sub": "1",
        "name": "User",
        "client_id": "client",
        "website": "https://user.com",
    }));
    assert_eq!(user.sub(), "1");
    assert_eq!(user.name.as_deref(), Some("User"));
    assert_eq!(user.client_id.as_deref(), Some("client"));
    assert_eq!(user.claim("website").unwrap(), "https://user.com");
    assert!(user.claims().is_some());
}

#[test]
fn client_credentials_token_uses_client_id_as_subject() {
    let user = AuthenticatedUser::from_claims(json!({ "client_id": "service" }));
    assert_eq!(user.sub, "service");
}

#[test]
fn missing_subject_is_empty() {
    let user = AuthenticatedUser::from_claims(json!({}));
    assert_eq!(user.sub, "");
    assert!(user.roles.is_empty());
}

#[test]
fn custom_extractor_is_used() {
    struct Fixed;
    impl RoleExtractor for Fixed {
        fn extract_roles(&self, _claims: &serde_json::Value) -> Vec<String> {
            vec!["fixed".into()]
        }
    }
    let user = AuthenticatedUser::from_claims_with(json!({ "sub": "1" }), &Fixed);
    assert_eq!(user.roles(), ["fixed".to_string()]);
}

#[test]
fn claim_role_extractor_handles_string_and_array() {
    let extractor = ClaimRoleExtractor::default();
    assert_eq!(extractor.claim(), "role");
    assert_eq!(extractor.extract_roles(&json!({ "role": "admin" })), vec!["admin"]);
    assert_eq!(
        extractor.extract_roles(&json!({ "role": ["a", 1, "b"] })),
        vec!["a", "b"]
    );
    assert!(extractor.extract_roles(&json!({ "role": 42 })).is_empty());
}

#[test]
fn nested_paths_are_followed() {
    let claims = json!({ "realm": { "roles": ["x"] } });
    assert_eq!(extract_claim_values(&claims, &["realm", "roles"]), vec!["x"]);
    assert!(extract_claim_values(&claims, &["realm", "missing"]).is_empty());
}
