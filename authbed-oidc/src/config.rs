//! Issuer configuration: clients, users, and resources.
//!
//! Everything here is plain data. It can be built in code with the
//! `with_*` methods or deserialized from a YAML fixture.

use std::collections::HashSet;

use authbed_core::config::{validation_result, ConfigError, ConfigValidationDetail};
use serde::{Deserialize, Serialize};

/// The `offline_access` scope: asks for a refresh token.
pub const OFFLINE_ACCESS: &str = "offline_access";

/// OAuth2 grant types the issuer understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    Password,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "password" => Some(GrantType::Password),
            "client_credentials" => Some(GrantType::ClientCredentials),
            "refresh_token" => Some(GrantType::RefreshToken),
            _ => None,
        }
    }
}

/// A typed claim attached to a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

fn default_grant_types() -> Vec<GrantType> {
    vec![GrantType::Password]
}

/// A registered OAuth2 client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    /// Plaintext secrets. Hashed when the issuer starts.
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default = "default_grant_types")]
    pub allowed_grant_types: Vec<GrantType>,
    #[serde(default)]
    pub allowed_scopes: Vec<String>,
    /// Allows `offline_access` and, with it, the refresh-token grant.
    #[serde(default)]
    pub allow_offline_access: bool,
    /// Overrides the issuer-wide access token lifetime.
    #[serde(default)]
    pub access_token_lifetime_secs: Option<u64>,
}

impl Client {
    /// A client allowed the password grant and nothing else.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secrets: Vec::new(),
            allowed_grant_types: default_grant_types(),
            allowed_scopes: Vec::new(),
            allow_offline_access: false,
            access_token_lifetime_secs: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secrets.push(secret.into());
        self
    }

    pub fn with_grant_types(mut self, grants: impl IntoIterator<Item = GrantType>) -> Self {
        self.allowed_grant_types = grants.into_iter().collect();
        self
    }

    pub fn with_scopes<S: Into<String>>(mut self, scopes: impl IntoIterator<Item = S>) -> Self {
        self.allowed_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offline_access(mut self, allow: bool) -> Self {
        self.allow_offline_access = allow;
        self
    }

    pub fn with_token_lifetime(mut self, secs: u64) -> Self {
        self.access_token_lifetime_secs = Some(secs);
        self
    }

    /// Whether this client may use `grant`. Refresh follows offline access.
    pub fn allows_grant(&self, grant: GrantType) -> bool {
        match grant {
            GrantType::RefreshToken => {
                self.allow_offline_access || self.allowed_grant_types.contains(&grant)
            }
            _ => self.allowed_grant_types.contains(&grant),
        }
    }
}

/// A test user with a plaintext password.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestUser {
    pub subject_id: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl TestUser {
    pub fn new(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            username: username.into(),
            password: password.into(),
            claims: Vec::new(),
        }
    }

    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push(Claim::new(claim_type, value));
        self
    }

    /// All values of one claim type, in order.
    pub fn claim_values<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }
}

/// The protected API, as the issuer knows it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiResource {
    /// Scope name and token audience.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Plaintext secrets for introspection. Hashed when the issuer starts.
    #[serde(default)]
    pub secrets: Vec<String>,
    /// User claim types copied into access tokens carrying this scope.
    #[serde(default)]
    pub user_claims: Vec<String>,
}

impl ApiResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            secrets: Vec::new(),
            user_claims: Vec::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secrets.push(secret.into());
        self
    }

    pub fn with_user_claims<S: Into<String>>(mut self, claims: impl IntoIterator<Item = S>) -> Self {
        self.user_claims = claims.into_iter().map(Into::into).collect();
        self
    }
}

/// An OpenID identity scope and the user claims it releases at userinfo.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityResource {
    pub name: String,
    #[serde(default)]
    pub user_claims: Vec<String>,
}

impl IdentityResource {
    pub fn new<S: Into<String>>(name: impl Into<String>, claims: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            user_claims: claims.into_iter().map(Into::into).collect(),
        }
    }

    /// `openid` and `profile`.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::new("openid", ["sub"]),
            Self::new(
                "profile",
                [
                    "name",
                    "family_name",
                    "given_name",
                    "middle_name",
                    "nickname",
                    "preferred_username",
                    "profile",
                    "picture",
                    "website",
                    "gender",
                    "birthdate",
                    "zoneinfo",
                    "locale",
                    "updated_at",
                ],
            ),
        ]
    }
}

fn default_issuer_uri() -> String {
    "http://localhost".into()
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_refresh_token_ttl() -> u64 {
    30 * 24 * 3600
}

fn default_api_resource() -> ApiResource {
    ApiResource::new("api")
}

/// Complete issuer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Value of `iss`, and the base of every endpoint URL.
    #[serde(default = "default_issuer_uri")]
    pub issuer_uri: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl_secs: u64,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub users: Vec<TestUser>,
    #[serde(default = "default_api_resource")]
    pub api_resource: ApiResource,
    #[serde(default = "IdentityResource::standard")]
    pub identity_resources: Vec<IdentityResource>,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            issuer_uri: default_issuer_uri(),
            token_ttl_secs: default_token_ttl(),
            refresh_token_ttl_secs: default_refresh_token_ttl(),
            clients: Vec::new(),
            users: Vec::new(),
            api_resource: default_api_resource(),
            identity_resources: IdentityResource::standard(),
        }
    }
}

impl IssuerConfig {
    /// Parse a YAML fixture.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        authbed_core::config::from_yaml_str(content)
    }

    /// Whether `scope` names a resource this issuer knows.
    pub fn is_known_scope(&self, scope: &str) -> bool {
        scope == OFFLINE_ACCESS
            || scope == self.api_resource.name
            || self.identity_resources.iter().any(|r| r.name == scope)
    }

    pub fn identity_resource(&self, name: &str) -> Option<&IdentityResource> {
        self.identity_resources.iter().find(|r| r.name == name)
    }

    /// Check the configuration is coherent, reporting every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut details = Vec::new();

        match url::Url::parse(&self.issuer_uri) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => details.push(ConfigValidationDetail::new(
                "issuer_uri",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => details.push(ConfigValidationDetail::new("issuer_uri", e.to_string())),
        }
        if self.token_ttl_secs == 0 {
            details.push(ConfigValidationDetail::new(
                "token_ttl_secs",
                "must be greater than zero",
            ));
        }

        let api = &self.api_resource.name;
        if api.trim().is_empty() {
            details.push(ConfigValidationDetail::new("api_resource.name", "must not be empty"));
        } else if api == OFFLINE_ACCESS || self.identity_resource(api).is_some() {
            details.push(ConfigValidationDetail::new(
                "api_resource.name",
                format!("'{api}' collides with an identity scope"),
            ));
        }

        let mut client_ids = HashSet::new();
        for (i, client) in self.clients.iter().enumerate() {
            let key = |field: &str| format!("clients[{i}].{field}");
            if client.client_id.is_empty() {
                details.push(ConfigValidationDetail::new(key("client_id"), "must not be empty"));
            } else if !client_ids.insert(client.client_id.as_str()) {
                details.push(ConfigValidationDetail::new(
                    key("client_id"),
                    format!("duplicate client id '{}'", client.client_id),
                ));
            }
            if client.secrets.is_empty() {
                details.push(ConfigValidationDetail::new(key("secrets"), "at least one secret is required"));
            }
            for scope in &client.allowed_scopes {
                if scope == OFFLINE_ACCESS {
                    details.push(ConfigValidationDetail::new(
                        key("allowed_scopes"),
                        "use allow_offline_access instead of listing offline_access",
                    ));
                } else if !self.is_known_scope(scope) {
                    details.push(ConfigValidationDetail::new(
                        key("allowed_scopes"),
                        format!("unknown scope '{scope}'"),
                    ));
                }
            }
        }

        let mut usernames = HashSet::new();
        let mut subjects = HashSet::new();
        for (i, user) in self.users.iter().enumerate() {
            if !usernames.insert(user.username.as_str()) {
                details.push(ConfigValidationDetail::new(
                    format!("users[{i}].username"),
                    format!("duplicate username '{}'", user.username),
                ));
            }
            if user.subject_id.is_empty() {
                details.push(ConfigValidationDetail::new(
                    format!("users[{i}].subject_id"),
                    "must not be empty",
                ));
            } else if !subjects.insert(user.subject_id.as_str()) {
                details.push(ConfigValidationDetail::new(
                    format!("users[{i}].subject_id"),
                    format!("duplicate subject '{}'", user.subject_id),
                ));
            }
        }

        validation_result(details)
    }
}
