use serde::Deserialize;
use tracing::debug;

use crate::backchannel::Backchannel;
use crate::error::SecurityError;

/// The subset of an OpenID Connect discovery document an API host needs.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenIdMetadata {
    pub issuer: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub introspection_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// Discovery URL for an authority.
pub fn discovery_url(authority: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        authority.trim_end_matches('/')
    )
}

impl OpenIdMetadata {
    /// Fetch the discovery document and check it describes `expected_issuer`.
    pub async fn fetch(
        backchannel: &Backchannel,
        authority: &str,
        expected_issuer: &str,
    ) -> Result<Self, SecurityError> {
        let url = discovery_url(authority);
        let metadata: OpenIdMetadata = backchannel.get_json(&url).await?;
        if metadata.issuer.trim_end_matches('/') != expected_issuer.trim_end_matches('/') {
            return Err(SecurityError::ValidationFailed(format!(
                "discovery issuer {} does not match {expected_issuer}",
                metadata.issuer
            )));
        }
        debug!(issuer = %metadata.issuer, jwks_uri = %metadata.jwks_uri, "Loaded discovery document");
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::discovery_url;

    #[test]
    fn discovery_url_ignores_trailing_slash() {
        assert_eq!(
            discovery_url("http://localhost/"),
            "http://localhost/.well-known/openid-configuration"
        );
        assert_eq!(
            discovery_url("http://localhost"),
            "http://localhost/.well-known/openid-configuration"
        );
    }
}
