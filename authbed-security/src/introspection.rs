//! RFC 7662 token introspection client.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backchannel::Backchannel;
use crate::config::SecurityConfig;
use crate::discovery::OpenIdMetadata;
use crate::error::SecurityError;

/// Validates tokens by asking the issuer, authenticating as the API resource.
#[derive(Clone, Debug)]
pub struct IntrospectionClient {
    endpoint: String,
    api_name: String,
    api_secret: String,
    backchannel: Backchannel,
}

impl IntrospectionClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_name: impl Into<String>,
        api_secret: impl Into<String>,
        backchannel: Backchannel,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_name: api_name.into(),
            api_secret: api_secret.into(),
            backchannel,
        }
    }

    /// Locate the introspection endpoint through discovery.
    pub async fn discover(
        config: &SecurityConfig,
        api_secret: &str,
        backchannel: Backchannel,
    ) -> Result<Self, SecurityError> {
        let metadata =
            OpenIdMetadata::fetch(&backchannel, &config.authority, config.expected_issuer())
                .await?;
        let endpoint = metadata.introspection_endpoint.ok_or_else(|| {
            SecurityError::Backchannel("discovery document has no introspection_endpoint".into())
        })?;
        Ok(Self::new(endpoint, &config.audience, api_secret, backchannel))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Introspect `token`, returning its claims when active.
    ///
    /// The returned object has `active` removed.
    pub async fn introspect(&self, token: &str) -> Result<Value, SecurityError> {
        let resp = self
            .backchannel
            .post_form(
                &self.endpoint,
                &[("token", token), ("token_type_hint", "access_token")],
                Some((&self.api_name, &self.api_secret)),
            )
            .await?;

        if resp.status == StatusCode::UNAUTHORIZED {
            warn!(api = %self.api_name, "Issuer rejected API credentials");
            return Err(SecurityError::Backchannel(
                "introspection endpoint rejected API credentials".into(),
            ));
        }
        if !resp.is_success() {
            return Err(SecurityError::Backchannel(format!(
                "introspection returned {}",
                resp.status
            )));
        }

        let mut claims: Value = resp.json()?;
        let active = claims
            .get("active")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !active {
            debug!("Token is not active");
            return Err(SecurityError::InvalidToken("token is not active".into()));
        }
        if let Some(obj) = claims.as_object_mut() {
            obj.remove("active");
        }
        if is_expired(&claims) {
            return Err(SecurityError::TokenExpired);
        }
        Ok(claims)
    }
}

fn is_expired(claims: &Value) -> bool {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    claims
        .get("exp")
        .and_then(Value::as_u64)
        .is_some_and(|exp| exp <= now)
}
