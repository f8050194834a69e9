//! Scope resolution for token requests.

use crate::config::{Client, IssuerConfig, OFFLINE_ACCESS};
use crate::error::OidcError;

fn split(scope: Option<&str>) -> Vec<&str> {
    let mut scopes: Vec<&str> = Vec::new();
    for s in scope.unwrap_or_default().split_whitespace() {
        if !scopes.contains(&s) {
            scopes.push(s);
        }
    }
    scopes
}

/// Scopes granted to a user-bound request (password grant).
///
/// An empty request means every scope the client is allowed, plus
/// `offline_access` when the client has offline access.
pub(crate) fn resolve_user_scopes(
    requested: Option<&str>,
    client: &Client,
    config: &IssuerConfig,
) -> Result<Vec<String>, OidcError> {
    let requested = split(requested);
    if requested.is_empty() {
        let mut scopes = client.allowed_scopes.clone();
        if client.allow_offline_access {
            scopes.push(OFFLINE_ACCESS.to_string());
        }
        return Ok(scopes);
    }

    requested
        .into_iter()
        .map(|scope| {
            let allowed = if scope == OFFLINE_ACCESS {
                client.allow_offline_access
            } else {
                config.is_known_scope(scope) && client.allowed_scopes.iter().any(|s| s == scope)
            };
            if allowed {
                Ok(scope.to_string())
            } else {
                Err(OidcError::InvalidScope(format!(
                    "scope '{scope}' is not allowed for client '{}'",
                    client.client_id
                )))
            }
        })
        .collect()
}

/// Scopes granted to a client acting on its own behalf. Only the API
/// scope qualifies; identity scopes need a user.
pub(crate) fn resolve_client_scopes(
    requested: Option<&str>,
    client: &Client,
    config: &IssuerConfig,
) -> Result<Vec<String>, OidcError> {
    let api = config.api_resource.name.as_str();
    let client_has_api = client.allowed_scopes.iter().any(|s| s == api);
    let requested = split(requested);
    if requested.is_empty() {
        return Ok(if client_has_api { vec![api.to_string()] } else { Vec::new() });
    }
    requested
        .into_iter()
        .map(|scope| {
            if scope == api && client_has_api {
                Ok(scope.to_string())
            } else {
                Err(OidcError::InvalidScope(format!(
                    "scope '{scope}' is not available to client credentials"
                )))
            }
        })
        .collect()
}

/// Scopes for a refreshed token: a subset of the original grant.
pub(crate) fn narrow_scopes(requested: Option<&str>, granted: &[String]) -> Result<Vec<String>, OidcError> {
    let requested = split(requested);
    if requested.is_empty() {
        return Ok(granted.to_vec());
    }
    requested
        .into_iter()
        .map(|scope| {
            if granted.iter().any(|g| g == scope) {
                Ok(scope.to_string())
            } else {
                Err(OidcError::InvalidScope(format!(
                    "scope '{scope}' was not part of the original grant"
                )))
            }
        })
        .collect()
}
