//! A throwaway OAuth2/OIDC token issuer that lives inside a test process.
//!
//! Configure a [`TokenIssuer`], call [`TokenIssuer::start`], and use the
//! returned [`IssuerHandle`]'s router as an in-process HTTP transport.
//!
//! ```ignore
//! use authbed_oidc::{ApiResource, Client, TestUser, TokenIssuer};
//!
//! let issuer = TokenIssuer::default()
//!     .with_clients(vec![Client::new("client").with_secret("secret").with_scopes(["api"])])
//!     .with_users(vec![TestUser::new("1", "user", "password").with_claim("name", "User")])
//!     .with_api_resource(ApiResource::new("api").with_secret("secret"))
//!     .start()?;
//!
//! let validator_transport = issuer.backchannel();
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod store;

mod grants;
mod handlers;
mod scopes;
mod state;
mod token;

use std::sync::Arc;

use authbed_security::{Backchannel, ClientCredentials, SecurityConfig, TokenClient};
use axum::routing::{get, post};
use axum::Router;
use jsonwebtoken::DecodingKey;
use serde_json::Value;
use tracing::info;

pub use client::ClientRegistry;
pub use config::{
    ApiResource, Claim, Client, GrantType, IdentityResource, IssuerConfig, TestUser,
    OFFLINE_ACCESS,
};
pub use error::{IssuerError, OidcError};
pub use keys::SigningKey;
pub use store::UserStore;

use crate::client::ApiCredentials;
use crate::grants::RefreshTokenStore;
use crate::state::{
    IssuerState, DISCOVERY_PATH, INTROSPECTION_PATH, JWKS_PATH, TOKEN_PATH, USERINFO_PATH,
};
use crate::token::TokenService;

/// An issuer that has not started yet.
///
/// All configuration happens here. [`start`](Self::start) consumes the
/// builder, so a running issuer cannot be reconfigured.
#[derive(Clone, Debug, Default)]
pub struct TokenIssuer {
    config: IssuerConfig,
}

impl TokenIssuer {
    pub fn new(config: IssuerConfig) -> Self {
        Self { config }
    }

    /// Replace clients, users and the API resource in one call.
    /// `scope_claims` become the user claims copied into API tokens.
    pub fn configure(
        self,
        clients: Vec<Client>,
        users: Vec<TestUser>,
        api_resource: ApiResource,
        scope_claims: Vec<String>,
    ) -> Self {
        self.with_clients(clients)
            .with_users(users)
            .with_api_resource(api_resource)
            .with_scope_claims(scope_claims)
    }

    pub fn with_clients(mut self, clients: Vec<Client>) -> Self {
        self.config.clients = clients;
        self
    }

    pub fn with_users(mut self, users: Vec<TestUser>) -> Self {
        self.config.users = users;
        self
    }

    pub fn with_api_resource(mut self, api_resource: ApiResource) -> Self {
        self.config.api_resource = api_resource;
        self
    }

    /// Set which user claim types are copied into tokens for the API scope.
    pub fn with_scope_claims<S: Into<String>>(mut self, claims: impl IntoIterator<Item = S>) -> Self {
        self.config.api_resource.user_claims = claims.into_iter().map(Into::into).collect();
        self
    }

    /// Set the default access token lifetime in seconds.
    pub fn with_token_ttl(mut self, secs: u64) -> Self {
        self.config.token_ttl_secs = secs;
        self
    }

    pub fn with_issuer_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.issuer_uri = uri.into();
        self
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Validate the configuration, hash secrets, generate the signing key,
    /// and build the router.
    ///
    /// Hashing and RSA generation are CPU-bound; async callers may want
    /// `spawn_blocking`.
    pub fn start(self) -> Result<IssuerHandle, IssuerError> {
        let mut config = self.config;
        config.validate()?;
        config.issuer_uri = config.issuer_uri.trim_end_matches('/').to_string();

        let key = Arc::new(SigningKey::generate()?);
        let clients = ClientRegistry::new(std::mem::take(&mut config.clients))?;
        let users = UserStore::new(std::mem::take(&mut config.users));
        let api = ApiCredentials::new(&config.api_resource.name, &config.api_resource.secrets)?;
        config.api_resource.secrets.clear();

        let tokens = TokenService::new(
            key.clone(),
            config.issuer_uri.clone(),
            config.api_resource.clone(),
            config.token_ttl_secs,
        );

        info!(
            issuer = %config.issuer_uri,
            api = %config.api_resource.name,
            kid = %key.kid(),
            clients = clients.len(),
            users = users.len(),
            "Token issuer started"
        );

        let state = Arc::new(IssuerState {
            config,
            key,
            tokens,
            clients,
            users,
            api,
            refresh_tokens: RefreshTokenStore::new(),
        });
        let router = issuer_routes(state.clone())?;
        Ok(IssuerHandle { state, router })
    }
}

/// Build the issuer router, nested under the issuer URI's path if it has one.
fn issuer_routes(state: Arc<IssuerState>) -> Result<Router, IssuerError> {
    let base_path = url::Url::parse(&state.config.issuer_uri)
        .map(|url| url.path().trim_end_matches('/').to_string())
        .map_err(|e| IssuerError::Config(authbed_core::ConfigError::Load(e.to_string())))?;

    let router = Router::new()
        .route(TOKEN_PATH, post(handlers::token_handler))
        .route(INTROSPECTION_PATH, post(handlers::introspection_handler))
        .route(USERINFO_PATH, get(handlers::userinfo_handler))
        .route(DISCOVERY_PATH, get(handlers::discovery_handler))
        .route(JWKS_PATH, get(handlers::jwks_handler))
        .with_state(state);

    let router = if base_path.is_empty() {
        router
    } else {
        Router::new().nest(&base_path, router)
    };
    Ok(authbed_core::with_default_layers(router))
}

/// A running issuer. Cheap to clone; all clones share one key and one
/// set of registries.
#[derive(Clone)]
pub struct IssuerHandle {
    state: Arc<IssuerState>,
    router: Router,
}

impl std::fmt::Debug for IssuerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerHandle")
            .field("issuer_uri", &self.state.config.issuer_uri)
            .field("kid", &self.state.key.kid())
            .finish()
    }
}

impl IssuerHandle {
    /// The issuer's HTTP surface, usable with `tower::ServiceExt::oneshot`
    /// or `axum::serve`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// An in-process transport to this issuer.
    pub fn backchannel(&self) -> Backchannel {
        Backchannel::in_process(self.router())
    }

    pub fn issuer_uri(&self) -> &str {
        &self.state.config.issuer_uri
    }

    pub fn api_name(&self) -> &str {
        &self.state.config.api_resource.name
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.state.config
    }

    pub fn token_endpoint(&self) -> String {
        self.state.endpoint(TOKEN_PATH)
    }

    pub fn introspection_endpoint(&self) -> String {
        self.state.endpoint(INTROSPECTION_PATH)
    }

    pub fn userinfo_endpoint(&self) -> String {
        self.state.endpoint(USERINFO_PATH)
    }

    pub fn discovery_url(&self) -> String {
        self.state.endpoint(DISCOVERY_PATH)
    }

    pub fn jwks_uri(&self) -> String {
        self.state.endpoint(JWKS_PATH)
    }

    pub fn key_id(&self) -> &str {
        self.state.key.kid()
    }

    /// Public key for verifying this issuer's tokens.
    pub fn decoding_key(&self) -> DecodingKey {
        self.state.key.decoding_key()
    }

    /// Security settings for an API host that trusts this issuer.
    pub fn security_config(&self) -> SecurityConfig {
        SecurityConfig::new(self.issuer_uri(), self.api_name())
    }

    /// A token client for `credentials`, talking to this issuer in-process.
    pub fn token_client(&self, credentials: ClientCredentials) -> TokenClient {
        TokenClient::new(self.token_endpoint(), credentials, self.backchannel())
    }

    /// Sign arbitrary claims with the issuer key, e.g. to forge an
    /// already-expired token.
    pub fn sign_claims(&self, claims: &Value) -> Result<String, IssuerError> {
        self.state
            .tokens
            .sign(claims)
            .map_err(|e| IssuerError::Signing(e.to_string()))
    }
}
