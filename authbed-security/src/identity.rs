use authbed_core::Identity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::openid::{ClaimRoleExtractor, RoleExtractor};

/// Represents a caller whose token has been validated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Subject claim ("sub"). Client-credentials tokens have no subject,
    /// so this falls back to "client_id".
    pub sub: String,

    /// Display name ("name"), if present in the token.
    pub name: Option<String>,

    /// Client the token was issued to ("client_id").
    pub client_id: Option<String>,

    /// Roles extracted from the token claims.
    pub roles: Vec<String>,

    /// Raw claims for advanced access.
    pub claims: Value,
}

impl Identity for AuthenticatedUser {
    fn sub(&self) -> &str {
        &self.sub
    }
    fn roles(&self) -> &[String] {
        &self.roles
    }
    fn claims(&self) -> Option<&Value> {
        Some(&self.claims)
    }
}

impl AuthenticatedUser {
    /// Build from validated claims, reading roles from the `role` claim.
    pub fn from_claims(claims: Value) -> Self {
        build_authenticated_user(claims, &ClaimRoleExtractor::default())
    }

    /// Build from claims with a custom role extractor.
    pub fn from_claims_with(claims: Value, extractor: &impl RoleExtractor) -> Self {
        build_authenticated_user(claims, extractor)
    }

    /// Check whether the user has a specific role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check whether the user has any of the specified roles.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}

/// Build an `AuthenticatedUser` from validated claims using the given role extractor.
pub fn build_authenticated_user(claims: Value, role_extractor: &impl RoleExtractor) -> AuthenticatedUser {
    let string_claim = |name: &str| claims.get(name).and_then(Value::as_str).map(String::from);

    let client_id = string_claim("client_id");
    let sub = string_claim("sub")
        .or_else(|| client_id.clone())
        .unwrap_or_default();
    let name = string_claim("name");
    let roles = role_extractor.extract_roles(&claims);

    AuthenticatedUser {
        sub,
        name,
        client_id,
        roles,
        claims,
    }
}
