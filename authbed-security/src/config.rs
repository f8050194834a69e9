use jsonwebtoken::Algorithm;

/// How an API host turns a bearer token into claims.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Verify the JWT locally against the issuer's published JWKS.
    #[default]
    Jwt,
    /// Ask the issuer's introspection endpoint, authenticating with the API secret.
    Introspection { api_secret: String },
}

/// Security configuration for an API host trusting a single authority.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Base URL of the token issuer. Discovery is fetched from
    /// `{authority}/.well-known/openid-configuration`.
    pub authority: String,

    /// Expected audience in the "aud" claim. Also the API name used for introspection.
    pub audience: String,

    /// Expected issuer in the "iss" claim. Defaults to the authority.
    pub issuer: Option<String>,

    /// Explicit JWKS URL. When unset, it is taken from the discovery document.
    pub jwks_url: Option<String>,

    pub mode: ValidationMode,

    /// Claim holding role names (default: `role`). May be a string or an array.
    pub role_claim: String,

    /// JWKS cache TTL in seconds (default: 3600)
    pub jwks_cache_ttl_secs: u64,

    /// Minimum interval between JWKS refresh attempts in seconds (default: 10)
    pub jwks_min_refresh_interval_secs: u64,

    /// Allowed JWT algorithms. Tokens using other algorithms are rejected.
    /// Default: RS256 only.
    pub allowed_algorithms: Vec<Algorithm>,

    /// Clock skew tolerated on `exp`/`nbf`, in seconds (default: 60).
    pub leeway_secs: u64,
}

impl SecurityConfig {
    /// Create a config trusting `authority` for tokens addressed to `audience`.
    pub fn new(authority: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            audience: audience.into(),
            issuer: None,
            jwks_url: None,
            mode: ValidationMode::Jwt,
            role_claim: "role".into(),
            jwks_cache_ttl_secs: 3600,
            jwks_min_refresh_interval_secs: 10,
            allowed_algorithms: vec![Algorithm::RS256],
            leeway_secs: 60,
        }
    }

    /// The issuer value tokens must carry.
    pub fn expected_issuer(&self) -> &str {
        self.issuer
            .as_deref()
            .unwrap_or_else(|| self.authority.trim_end_matches('/'))
    }

    /// URL of the authority's discovery document.
    pub fn discovery_url(&self) -> String {
        crate::discovery::discovery_url(&self.authority)
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Skip discovery and fetch keys from this URL directly.
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = Some(url.into());
        self
    }

    /// Validate tokens through the introspection endpoint instead of locally.
    pub fn with_introspection(mut self, api_secret: impl Into<String>) -> Self {
        self.mode = ValidationMode::Introspection {
            api_secret: api_secret.into(),
        };
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_role_claim(mut self, claim: impl Into<String>) -> Self {
        self.role_claim = claim.into();
        self
    }

    /// Set the JWKS cache TTL in seconds.
    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.jwks_cache_ttl_secs = ttl_secs;
        self
    }

    /// Set the minimum interval between JWKS refresh attempts.
    pub fn with_min_refresh_interval(mut self, interval_secs: u64) -> Self {
        self.jwks_min_refresh_interval_secs = interval_secs;
        self
    }

    /// Set the allowed JWT algorithms. Empty lists will cause validation to fail.
    pub fn with_allowed_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = Algorithm>,
    ) -> Self {
        self.allowed_algorithms = algorithms.into_iter().collect();
        self
    }

    /// Convenience method to allow a single algorithm.
    pub fn with_allowed_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.allowed_algorithms = vec![algorithm];
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }
}
