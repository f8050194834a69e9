//! Role extraction from token claims.

use serde_json::Value;

/// Trait for extracting roles from validated claims.
///
/// Issuers disagree on where roles live. Implement this to read a
/// provider-specific layout.
pub trait RoleExtractor: Send + Sync {
    fn extract_roles(&self, claims: &Value) -> Vec<String>;
}

/// Reads roles from a single top-level claim (`role` by default).
///
/// Issuers emit a lone role as a string and several as an array; both
/// shapes are accepted.
#[derive(Debug, Clone)]
pub struct ClaimRoleExtractor {
    claim: String,
}

impl ClaimRoleExtractor {
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
        }
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }
}

impl Default for ClaimRoleExtractor {
    fn default() -> Self {
        Self::new("role")
    }
}

impl RoleExtractor for ClaimRoleExtractor {
    fn extract_roles(&self, claims: &Value) -> Vec<String> {
        extract_claim_values(claims, &[&self.claim])
    }
}

/// Collect the string values at a nested JSON path.
///
/// A string yields one value, an array yields its string elements, and
/// anything else (or a missing path) yields nothing.
///
/// ```
/// use authbed_security::openid::extract_claim_values;
///
/// let claims = serde_json::json!({ "role": "admin", "groups": { "ids": ["a", "b"] } });
/// assert_eq!(extract_claim_values(&claims, &["role"]), vec!["admin"]);
/// assert_eq!(extract_claim_values(&claims, &["groups", "ids"]), vec!["a", "b"]);
/// ```
pub fn extract_claim_values(value: &Value, path: &[&str]) -> Vec<String> {
    let mut current = value;
    for key in path {
        match current.get(*key) {
            Some(v) => current = v,
            None => return Vec::new(),
        }
    }

    match current {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}
