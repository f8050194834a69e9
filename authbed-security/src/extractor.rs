use std::sync::Arc;

use authbed_core::HttpError;
use axum::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::{debug, warn};

use crate::error::SecurityError;
use crate::identity::AuthenticatedUser;
use crate::validator::ClaimsValidator;

/// Extract a Bearer token from the Authorization header value.
pub fn extract_bearer_token(header_value: &str) -> Result<&str, SecurityError> {
    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or(SecurityError::InvalidAuthScheme)?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(SecurityError::InvalidAuthScheme);
    }
    Ok(token.trim())
}

/// Extract the Bearer token from request headers without validating it.
pub fn bearer_token_from_headers(headers: &HeaderMap) -> Result<&str, SecurityError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(SecurityError::MissingAuthHeader)?;
    let auth_value = auth_header
        .to_str()
        .map_err(|_| SecurityError::InvalidAuthScheme)?;
    extract_bearer_token(auth_value)
}

/// Authenticate the caller described by `headers`.
pub async fn authenticate_headers(
    validator: &ClaimsValidator,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, SecurityError> {
    let token = bearer_token_from_headers(headers)?;
    validator.authenticate(token).await
}

async fn authenticate_parts(
    parts: &Parts,
    validator: &ClaimsValidator,
) -> Result<AuthenticatedUser, HttpError> {
    // Already authenticated by the policy middleware.
    if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
        return Ok(user.clone());
    }
    let user = authenticate_headers(validator, &parts.headers)
        .await
        .map_err(|e| {
            warn!(uri = %parts.uri, error = %e, "Authentication failed");
            HttpError::from(e)
        })?;
    debug!(uri = %parts.uri, sub = %user.sub, "Authenticated request");
    Ok(user)
}

/// Axum extractor for `AuthenticatedUser`.
///
/// The router state must provide `Arc<ClaimsValidator>` via `FromRef`.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<ClaimsValidator>: FromRef<S>,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let validator: Arc<ClaimsValidator> = Arc::from_ref(state);
        authenticate_parts(parts, &validator).await
    }
}

/// `Option<AuthenticatedUser>`: no Authorization header gives `None`, a bad
/// token is still rejected.
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<ClaimsValidator>: FromRef<S>,
{
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION)
            && parts.extensions.get::<AuthenticatedUser>().is_none()
        {
            return Ok(None);
        }
        let validator: Arc<ClaimsValidator> = Arc::from_ref(state);
        authenticate_parts(parts, &validator).await.map(Some)
    }
}
