use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backchannel::Backchannel;
use crate::config::{SecurityConfig, ValidationMode};
use crate::error::SecurityError;
use crate::identity::{build_authenticated_user, AuthenticatedUser};
use crate::introspection::IntrospectionClient;
use crate::jwks::JwksCache;
use crate::openid::ClaimRoleExtractor;

/// Where claims come from: local verification or the issuer.
enum ClaimsSource {
    Jwks(Arc<JwksCache>),
    Static(DecodingKey),
    Introspection(IntrospectionClient),
}

/// Turns bearer tokens into validated claims.
///
/// Shared across requests behind an `Arc`; handlers reach it through
/// `FromRef` on their router state.
pub struct ClaimsValidator {
    source: ClaimsSource,
    config: SecurityConfig,
    roles: ClaimRoleExtractor,
}

impl ClaimsValidator {
    /// Build the validator `config.mode` asks for, contacting the issuer
    /// over `backchannel` for discovery and keys.
    pub async fn discover(
        config: SecurityConfig,
        backchannel: Backchannel,
    ) -> Result<Self, SecurityError> {
        match config.mode.clone() {
            ValidationMode::Jwt => {
                let jwks = JwksCache::new(config.clone(), backchannel).await?;
                Ok(Self::new(Arc::new(jwks), config))
            }
            ValidationMode::Introspection { api_secret } => {
                let client = IntrospectionClient::discover(&config, &api_secret, backchannel).await?;
                Ok(Self::new_with_introspection(client, config))
            }
        }
    }

    /// Create a validator backed by a JWKS cache.
    pub fn new(jwks: Arc<JwksCache>, config: SecurityConfig) -> Self {
        Self::with_source(ClaimsSource::Jwks(jwks), config)
    }

    /// Create a validator with a static decoding key (useful for testing).
    pub fn new_with_static_key(key: DecodingKey, config: SecurityConfig) -> Self {
        Self::with_source(ClaimsSource::Static(key), config)
    }

    pub fn new_with_introspection(client: IntrospectionClient, config: SecurityConfig) -> Self {
        Self::with_source(ClaimsSource::Introspection(client), config)
    }

    fn with_source(source: ClaimsSource, config: SecurityConfig) -> Self {
        let roles = ClaimRoleExtractor::new(&config.role_claim);
        Self {
            source,
            config,
            roles,
        }
    }

    /// Returns the security configuration.
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Validate a token and return the raw claims.
    pub async fn validate(&self, token: &str) -> Result<Value, SecurityError> {
        if token.is_empty() {
            return Err(SecurityError::InvalidToken("empty token".into()));
        }
        let claims = match &self.source {
            ClaimsSource::Static(key) => self.validate_jwt(token, key.clone())?,
            ClaimsSource::Jwks(jwks) => {
                let kid = decode_header(token)
                    .map_err(|e| {
                        SecurityError::InvalidToken(format!("Failed to decode header: {e}"))
                    })?
                    .kid
                    .ok_or_else(|| {
                        SecurityError::InvalidToken("JWT header missing 'kid' field".into())
                    })?;
                let key = jwks.get_key(&kid).await?;
                self.validate_jwt(token, key)?
            }
            ClaimsSource::Introspection(client) => client.introspect(token).await?,
        };

        let sub = claims
            .get("sub")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("-");
        debug!(sub, "Token validated");
        Ok(claims)
    }

    /// Validate a token and build the caller's identity.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, SecurityError> {
        let claims = self.validate(token).await?;
        Ok(build_authenticated_user(claims, &self.roles))
    }

    fn validate_jwt(&self, token: &str, key: DecodingKey) -> Result<Value, SecurityError> {
        let header = decode_header(token)
            .map_err(|e| SecurityError::InvalidToken(format!("Failed to decode header: {e}")))?;
        let algorithm = header.alg;

        if self.config.allowed_algorithms.is_empty() {
            return Err(SecurityError::ValidationFailed(
                "No allowed JWT algorithms configured".into(),
            ));
        }
        if !self.config.allowed_algorithms.contains(&algorithm) {
            return Err(SecurityError::ValidationFailed(format!(
                "Disallowed JWT algorithm: {algorithm:?}"
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.algorithms = self.config.allowed_algorithms.clone();
        validation.set_issuer(&[self.config.expected_issuer()]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = self.config.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;

        decode::<Value>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        SecurityError::ValidationFailed("Invalid issuer".into())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                        SecurityError::ValidationFailed("Invalid audience".into())
                    }
                    _ => SecurityError::InvalidToken(e.to_string()),
                };
                warn!(error = %err, "JWT claim validation failed");
                err
            })
    }
}
