use authbed_oidc::{ApiResource, Client, IssuerError, IssuerHandle, TestUser, TokenIssuer};
use authbed_security::{ClientCredentials, SecurityError, TokenError};
use tracing::{debug, info};

use crate::app::TestApp;
use crate::fixtures;

/// How the API host checks bearer tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Verify signatures locally against the issuer's JWKS.
    #[default]
    Jwt,
    /// Ask the issuer's introspection endpoint, authenticating as the API.
    Introspection,
}

/// Everything a [`Harness`] is built from. Start from `default()` and
/// override fields.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub clients: Vec<Client>,
    pub users: Vec<TestUser>,
    pub api_name: String,
    pub api_secret: String,
    /// User claim types copied into API tokens.
    pub scope_claims: Vec<String>,
    /// Client used by [`Harness::get_token`].
    pub credentials: ClientCredentials,
    /// Scope requested by [`Harness::get_token`]. `None` asks for every
    /// scope the client is allowed.
    pub scope: Option<String>,
    pub validation: ValidationMode,
    /// Install a test tracing subscriber.
    pub logging: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::for_api(fixtures::API_NAME)
    }
}

impl HarnessConfig {
    /// Default cast protecting an API resource called `api_name`. The client
    /// is allowed that scope and [`Harness::get_token`] requests it.
    pub fn for_api(api_name: &str) -> Self {
        Self {
            clients: fixtures::clients_for(api_name),
            users: fixtures::users(),
            api_name: api_name.into(),
            api_secret: fixtures::API_SECRET.into(),
            scope_claims: vec!["role".into()],
            credentials: fixtures::credentials(),
            scope: Some(api_name.into()),
            validation: ValidationMode::Jwt,
            logging: false,
        }
    }
}

/// Harness setup failure.
#[derive(Debug)]
pub enum HarnessError {
    Issuer(IssuerError),
    Api(SecurityError),
    Join(String),
}

impl std::fmt::Display for HarnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessError::Issuer(e) => write!(f, "failed to start issuer: {e}"),
            HarnessError::Api(e) => write!(f, "failed to start API host: {e}"),
            HarnessError::Join(msg) => write!(f, "issuer startup task failed: {msg}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Issuer(e) => Some(e),
            HarnessError::Api(e) => Some(e),
            HarnessError::Join(_) => None,
        }
    }
}

impl From<IssuerError> for HarnessError {
    fn from(err: IssuerError) -> Self {
        HarnessError::Issuer(err)
    }
}

impl From<SecurityError> for HarnessError {
    fn from(err: SecurityError) -> Self {
        HarnessError::Api(err)
    }
}

/// A private issuer and API host pair for one test.
///
/// ```ignore
/// let mut harness = Harness::setup().await?;
/// harness.api().post("/api/values").json(&body).send().await.assert_unauthorized();
/// harness.attach_token("user", "password").await?;
/// harness.api().post("/api/values").json(&body).send().await.assert_ok();
/// ```
pub struct Harness {
    config: HarnessConfig,
    issuer: IssuerHandle,
    api: TestApp,
}

impl Harness {
    /// Boot with the default fixtures.
    pub async fn setup() -> Result<Self, HarnessError> {
        Self::with_config(HarnessConfig::default()).await
    }

    pub async fn with_config(config: HarnessConfig) -> Result<Self, HarnessError> {
        if config.logging {
            authbed_core::try_init_test_tracing();
        }

        let builder = TokenIssuer::default().configure(
            config.clients.clone(),
            config.users.clone(),
            ApiResource::new(&config.api_name).with_secret(&config.api_secret),
            config.scope_claims.clone(),
        );
        let issuer = tokio::task::spawn_blocking(move || builder.start())
            .await
            .map_err(|e| HarnessError::Join(e.to_string()))??;

        let security = match config.validation {
            ValidationMode::Jwt => issuer.security_config(),
            ValidationMode::Introspection => issuer
                .security_config()
                .with_introspection(&config.api_secret),
        };
        let router = authbed_api::build(security, issuer.backchannel()).await?;

        info!(
            issuer = issuer.issuer_uri(),
            validation = ?config.validation,
            "Harness ready"
        );
        Ok(Self {
            config,
            issuer,
            api: TestApp::new(router),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn issuer(&self) -> &IssuerHandle {
        &self.issuer
    }

    /// A client for the issuer's own endpoints.
    pub fn issuer_app(&self) -> TestApp {
        TestApp::new(self.issuer.router())
    }

    /// The shared API client. Carries the bearer set by
    /// [`attach_token`](Self::attach_token).
    pub fn api(&self) -> &TestApp {
        &self.api
    }

    /// A fresh API client with no bearer, on the same hosts.
    pub fn new_client(&self) -> TestApp {
        TestApp::new(self.api.router())
    }

    /// Password-grant token using the configured client.
    pub async fn get_token(&self, username: &str, password: &str) -> Result<String, TokenError> {
        self.get_token_as(username, password, &self.config.credentials)
            .await
    }

    pub async fn get_token_as(
        &self,
        username: &str,
        password: &str,
        credentials: &ClientCredentials,
    ) -> Result<String, TokenError> {
        let response = self
            .issuer
            .token_client(credentials.clone())
            .request_password_token(username, password, self.config.scope.as_deref())
            .await?;
        if response.access_token.is_empty() {
            return Err(TokenError::EmptyToken);
        }
        debug!(username, client_id = %credentials.client_id, "Harness obtained token");
        Ok(response.access_token)
    }

    /// Fetch a token and make it the shared client's bearer. On failure
    /// the previous bearer stays in place.
    pub async fn attach_token(&mut self, username: &str, password: &str) -> Result<(), TokenError> {
        let token = self.get_token(username, password).await?;
        self.api.set_bearer(token);
        Ok(())
    }

    pub fn clear_token(&mut self) {
        self.api.clear_bearer();
    }
}
