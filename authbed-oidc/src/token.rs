use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::config::{ApiResource, Client, TestUser};
use crate::error::OidcError;
use crate::keys::SigningKey;

/// Claims the issuer sets itself; user claims never overwrite them.
const RESERVED: &[&str] = &[
    "iss",
    "sub",
    "aud",
    "exp",
    "nbf",
    "iat",
    "jti",
    "client_id",
    "scope",
    "auth_time",
    "idp",
    "amr",
];

pub(crate) fn now_secs() -> Result<u64, OidcError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| OidcError::Internal(format!("system clock error: {e}")))
}

/// What an access token is being minted for.
pub(crate) struct TokenSubject<'a> {
    pub client: &'a Client,
    pub user: Option<&'a TestUser>,
    pub scopes: &'a [String],
    /// When the user originally authenticated; carried across refreshes.
    pub auth_time: Option<u64>,
}

/// Signs and verifies the issuer's access tokens.
pub(crate) struct TokenService {
    key: Arc<SigningKey>,
    issuer: String,
    api: ApiResource,
    default_ttl_secs: u64,
}

impl TokenService {
    pub fn new(key: Arc<SigningKey>, issuer: String, api: ApiResource, default_ttl_secs: u64) -> Self {
        Self {
            key,
            issuer,
            api,
            default_ttl_secs,
        }
    }

    pub fn ttl_for(&self, client: &Client) -> u64 {
        client
            .access_token_lifetime_secs
            .unwrap_or(self.default_ttl_secs)
    }

    /// Mint an access token. Returns the JWT and its lifetime in seconds.
    pub fn issue(&self, subject: &TokenSubject<'_>) -> Result<(String, u64), OidcError> {
        let now = now_secs()?;
        let ttl = self.ttl_for(subject.client);
        let api_granted = subject.scopes.iter().any(|s| *s == self.api.name);
        let audience = if api_granted {
            self.api.name.clone()
        } else {
            format!("{}/resources", self.issuer)
        };

        let mut claims = Map::new();
        claims.insert("iss".into(), json!(self.issuer));
        claims.insert("aud".into(), json!(audience));
        claims.insert("nbf".into(), json!(now));
        claims.insert("iat".into(), json!(now));
        claims.insert("exp".into(), json!(now + ttl));
        claims.insert("client_id".into(), json!(subject.client.client_id));
        claims.insert("jti".into(), json!(uuid::Uuid::new_v4().simple().to_string()));
        claims.insert("scope".into(), json!(subject.scopes));

        if let Some(user) = subject.user {
            claims.insert("sub".into(), json!(user.subject_id));
            claims.insert("auth_time".into(), json!(subject.auth_time.unwrap_or(now)));
            claims.insert("idp".into(), json!("local"));
            claims.insert("amr".into(), json!(["pwd"]));
            if api_granted {
                self.add_user_claims(&mut claims, user);
            }
        }

        Ok((self.sign(&Value::Object(claims))?, ttl))
    }

    fn add_user_claims(&self, claims: &mut Map<String, Value>, user: &TestUser) {
        for claim_type in &self.api.user_claims {
            if RESERVED.contains(&claim_type.as_str()) {
                warn!(claim = %claim_type, "Ignoring reserved claim in API user claims");
                continue;
            }
            if let Some(value) = user_claim_value(user, claim_type) {
                claims.insert(claim_type.clone(), value);
            }
        }
    }

    /// Sign arbitrary claims with the issuer key.
    pub fn sign(&self, claims: &Value) -> Result<String, OidcError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key.kid().to_string());
        encode(&header, claims, self.key.encoding_key())
            .map_err(|e| OidcError::Internal(format!("failed to sign JWT: {e}")))
    }

    /// Verify one of this issuer's tokens: signature, `iss`, `exp`, `nbf`.
    /// The audience is left to the caller.
    pub fn verify(&self, token: &str) -> Result<Value, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = 0;
        decode::<Value>(token, &self.key.decoding_key(), &validation).map(|data| data.claims)
    }
}

/// A user's values for `claim_type`: one value as a string, several as an array.
pub(crate) fn user_claim_value(user: &TestUser, claim_type: &str) -> Option<Value> {
    let values: Vec<&str> = user.claim_values(claim_type).collect();
    match values.as_slice() {
        [] => None,
        [single] => Some(json!(single)),
        many => Some(json!(many)),
    }
}

/// Whether the `aud` claim (string or array) contains `audience`.
pub(crate) fn has_audience(claims: &Value, audience: &str) -> bool {
    match claims.get("aud") {
        Some(Value::String(aud)) => aud == audience,
        Some(Value::Array(auds)) => auds.iter().any(|a| a.as_str() == Some(audience)),
        _ => false,
    }
}

/// The `scope` claim as a list (array or space-separated string).
pub(crate) fn token_scopes(claims: &Value) -> Vec<String> {
    match claims.get("scope") {
        Some(Value::Array(scopes)) => scopes
            .iter()
            .filter_map(|s| s.as_str().map(String::from))
            .collect(),
        Some(Value::String(scopes)) => scopes.split_whitespace().map(String::from).collect(),
        _ => Vec::new(),
    }
}
