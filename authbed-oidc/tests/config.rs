use authbed_core::ConfigError;
use authbed_oidc::{
    ApiResource, Client, GrantType, IssuerConfig, IssuerError, TestUser, TokenIssuer,
};

const FIXTURE: &str = r#"
issuer_uri: http://localhost
token_ttl_secs: 600
clients:
  - client_id: client
    secrets: [secret]
    allowed_grant_types: [password, client_credentials]
    allowed_scopes: [openid, api]
    allow_offline_access: true
users:
  - subject_id: "1"
    username: user
    password: password
    claims:
      - { type: name, value: User }
      - { type: website, value: "https://user.com" }
api_resource:
  name: api
  secrets: [secret]
  user_claims: [role]
"#;

fn validation_keys(err: IssuerError) -> Vec<String> {
    match err {
        IssuerError::Config(ConfigError::Validation(details)) => {
            details.into_iter().map(|d| d.key).collect()
        }
        other => panic!("expected a validation error, got {other}"),
    }
}

#[test]
fn yaml_fixture_parses() {
    let config = IssuerConfig::from_yaml(FIXTURE).unwrap();
    assert_eq!(config.token_ttl_secs, 600);
    assert_eq!(config.clients.len(), 1);
    let client = &config.clients[0];
    assert!(client.allows_grant(GrantType::ClientCredentials));
    assert!(client.allows_grant(GrantType::RefreshToken));
    assert_eq!(config.users[0].claim_values("name").collect::<Vec<_>>(), ["User"]);
    assert_eq!(config.api_resource.user_claims, ["role"]);
    // Identity resources fall back to the standard set.
    assert!(config.identity_resource("profile").is_some());

    let handle = TokenIssuer::new(config).start().unwrap();
    assert_eq!(handle.api_name(), "api");
    // Plaintext secrets do not survive start.
    assert!(handle.config().api_resource.secrets.is_empty());
    assert!(handle.config().clients.is_empty());
}

#[test]
fn malformed_yaml_is_a_load_error() {
    let err = IssuerConfig::from_yaml("clients: {").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn duplicate_users_and_clients_are_rejected() {
    let err = TokenIssuer::default()
        .with_clients(vec![
            Client::new("client").with_secret("a"),
            Client::new("client").with_secret("b"),
        ])
        .with_users(vec![
            TestUser::new("1", "user", "x"),
            TestUser::new("1", "user", "y"),
        ])
        .start()
        .unwrap_err();
    let keys = validation_keys(err);
    assert!(keys.contains(&"clients[1].client_id".to_string()));
    assert!(keys.contains(&"users[1].username".to_string()));
    assert!(keys.contains(&"users[1].subject_id".to_string()));
}

#[test]
fn unknown_scope_and_missing_secret_are_rejected() {
    let err = TokenIssuer::default()
        .with_clients(vec![Client::new("client").with_scopes(["payments"])])
        .start()
        .unwrap_err();
    let keys = validation_keys(err);
    assert!(keys.contains(&"clients[0].secrets".to_string()));
    assert!(keys.contains(&"clients[0].allowed_scopes".to_string()));
}

#[test]
fn bad_issuer_uri_and_ttl_are_rejected() {
    let err = TokenIssuer::default()
        .with_issuer_uri("ftp://localhost")
        .with_token_ttl(0)
        .start()
        .unwrap_err();
    let keys = validation_keys(err);
    assert_eq!(keys, ["issuer_uri", "token_ttl_secs"]);
}

#[test]
fn api_name_must_not_shadow_identity_scopes() {
    let err = TokenIssuer::default()
        .with_api_resource(ApiResource::new("openid").with_secret("secret"))
        .start()
        .unwrap_err();
    assert_eq!(validation_keys(err), ["api_resource.name"]);
}
