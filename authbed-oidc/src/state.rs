use std::sync::Arc;

use crate::client::{ApiCredentials, ClientRegistry};
use crate::config::IssuerConfig;
use crate::grants::RefreshTokenStore;
use crate::keys::SigningKey;
use crate::store::UserStore;
use crate::token::TokenService;

pub(crate) const TOKEN_PATH: &str = "/connect/token";
pub(crate) const INTROSPECTION_PATH: &str = "/connect/introspect";
pub(crate) const USERINFO_PATH: &str = "/connect/userinfo";
pub(crate) const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub(crate) const JWKS_PATH: &str = "/.well-known/openid-configuration/jwks";

/// Shared state behind every issuer endpoint. Frozen at start.
pub(crate) struct IssuerState {
    /// Configuration with all plaintext client and API secrets removed.
    pub config: IssuerConfig,
    pub key: Arc<SigningKey>,
    pub tokens: TokenService,
    pub clients: ClientRegistry,
    pub users: UserStore,
    pub api: ApiCredentials,
    pub refresh_tokens: RefreshTokenStore,
}

impl IssuerState {
    /// Absolute URL of an endpoint under the issuer URI.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.issuer_uri.trim_end_matches('/'))
    }
}
