use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::backchannel::Backchannel;
use crate::config::SecurityConfig;
use crate::discovery::OpenIdMetadata;
use crate::error::SecurityError;

/// A published key. Unknown fields (`use`, `alg`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// JWKS response envelope.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Raw components of a cached key; the `DecodingKey` is rebuilt per lookup.
#[derive(Debug, Clone)]
struct CachedJwk {
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

impl CachedJwk {
    fn to_decoding_key(&self) -> Result<DecodingKey, SecurityError> {
        match self.kty.as_str() {
            "RSA" => {
                let n = self.n.as_deref().ok_or_else(|| {
                    SecurityError::ValidationFailed("RSA key missing 'n' component".into())
                })?;
                let e = self.e.as_deref().ok_or_else(|| {
                    SecurityError::ValidationFailed("RSA key missing 'e' component".into())
                })?;
                DecodingKey::from_rsa_components(n, e).map_err(|err| {
                    SecurityError::ValidationFailed(format!(
                        "Failed to construct RSA decoding key: {err}"
                    ))
                })
            }
            other => Err(SecurityError::ValidationFailed(format!(
                "Unsupported key type: {other}"
            ))),
        }
    }
}

/// Cached state behind the lock.
struct CacheInner {
    keys: HashMap<String, CachedJwk>,
    last_refresh: Option<Instant>,
    last_refresh_attempt: Option<Instant>,
}

/// Cache of the issuer's signing keys, indexed by `kid`.
///
/// When a requested `kid` is not found, the cache refreshes from the JWKS
/// endpoint before failing. Refreshes are rate-limited by
/// `jwks_min_refresh_interval_secs`.
pub struct JwksCache {
    inner: Arc<RwLock<CacheInner>>,
    config: SecurityConfig,
    jwks_url: String,
    backchannel: Backchannel,
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    /// Resolve the JWKS URL (explicit or via discovery) and perform an initial fetch.
    pub async fn new(config: SecurityConfig, backchannel: Backchannel) -> Result<Self, SecurityError> {
        let jwks_url = match &config.jwks_url {
            Some(url) => url.clone(),
            None => {
                OpenIdMetadata::fetch(&backchannel, &config.authority, config.expected_issuer())
                    .await?
                    .jwks_uri
            }
        };
        Self::with_url(jwks_url, config, backchannel).await
    }

    /// Create a cache for a known JWKS URL and perform an initial fetch.
    pub async fn with_url(
        jwks_url: impl Into<String>,
        config: SecurityConfig,
        backchannel: Backchannel,
    ) -> Result<Self, SecurityError> {
        let cache = Self {
            inner: Arc::new(RwLock::new(CacheInner {
                keys: HashMap::new(),
                last_refresh: None,
                last_refresh_attempt: None,
            })),
            config,
            jwks_url: jwks_url.into(),
            backchannel,
            refresh_lock: Mutex::new(()),
        };
        cache.refresh().await?;
        Ok(cache)
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Number of keys currently cached.
    pub async fn len(&self) -> usize {
        self.inner.read().await.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Decoding key for `kid`.
    ///
    /// A stale cache is refreshed opportunistically; an unknown `kid` forces
    /// a refresh (subject to the minimum interval) before giving up.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, SecurityError> {
        let ttl = Duration::from_secs(self.config.jwks_cache_ttl_secs);

        let force = {
            let cache = self.inner.read().await;
            match cache.keys.get(kid) {
                Some(jwk) if !is_stale(cache.last_refresh, ttl) => return jwk.to_decoding_key(),
                Some(_) => false,
                None => true,
            }
        };
        self.try_refresh(force).await?;

        let cache = self.inner.read().await;
        cache
            .keys
            .get(kid)
            .ok_or_else(|| SecurityError::UnknownKeyId(kid.to_string()))?
            .to_decoding_key()
    }

    async fn refresh(&self) -> Result<(), SecurityError> {
        let jwks: JwksResponse = self
            .backchannel
            .get_json(&self.jwks_url)
            .await
            .map_err(|e| SecurityError::JwksFetchError(e.to_string()))?;

        let keys: HashMap<String, CachedJwk> = jwks
            .keys
            .into_iter()
            .filter_map(|jwk| {
                let kid = jwk.kid?;
                Some((
                    kid,
                    CachedJwk {
                        kty: jwk.kty,
                        n: jwk.n,
                        e: jwk.e,
                    },
                ))
            })
            .collect();
        debug!(url = %self.jwks_url, count = keys.len(), "Refreshed JWKS");

        let now = Instant::now();
        let mut cache = self.inner.write().await;
        cache.keys = keys;
        cache.last_refresh = Some(now);
        cache.last_refresh_attempt = Some(now);

        Ok(())
    }

    async fn try_refresh(&self, force: bool) -> Result<(), SecurityError> {
        let ttl = Duration::from_secs(self.config.jwks_cache_ttl_secs);
        let min_interval = Duration::from_secs(self.config.jwks_min_refresh_interval_secs);

        {
            let cache = self.inner.read().await;
            if !force && !is_stale(cache.last_refresh, ttl) {
                return Ok(());
            }
            if !can_attempt(cache.last_refresh_attempt, min_interval) {
                return Ok(());
            }
        }

        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.inner.read().await;
            if !force && !is_stale(cache.last_refresh, ttl) {
                return Ok(());
            }
            if !can_attempt(cache.last_refresh_attempt, min_interval) {
                return Ok(());
            }
        }

        {
            let mut cache = self.inner.write().await;
            cache.last_refresh_attempt = Some(Instant::now());
        }

        self.refresh().await
    }
}

fn is_stale(last_refresh: Option<Instant>, ttl: Duration) -> bool {
    match last_refresh {
        None => true,
        Some(ts) => ts.elapsed() >= ttl,
    }
}

fn can_attempt(last_attempt: Option<Instant>, min_interval: Duration) -> bool {
    match last_attempt {
        None => true,
        Some(ts) => ts.elapsed() >= min_interval,
    }
}
