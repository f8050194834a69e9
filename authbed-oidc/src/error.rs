use authbed_core::ConfigError;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// OAuth 2.0 error response per RFC 6749 Section 5.2.
#[derive(Debug, Serialize)]
pub struct OidcErrorBody {
    pub error: &'static str,
    pub error_description: String,
}

/// Protocol error returned by the issuer's endpoints.
#[derive(Debug)]
pub enum OidcError {
    /// Missing or malformed parameters.
    InvalidRequest(String),
    /// Unknown client or wrong secret.
    InvalidClient(String),
    /// Wrong user credentials, or an unusable refresh token.
    InvalidGrant(String),
    /// The client is not allowed this grant type.
    UnauthorizedClient(String),
    UnsupportedGrantType(String),
    /// A requested scope is unknown or not allowed for the client.
    InvalidScope(String),
    /// Bearer token rejected at a protected issuer endpoint (RFC 6750).
    InvalidToken(String),
    /// Bearer token lacks a scope the endpoint needs (RFC 6750).
    InsufficientScope(String),
    Internal(String),
}

impl OidcError {
    pub fn error_code(&self) -> &'static str {
        match self {
            OidcError::InvalidRequest(_) => "invalid_request",
            OidcError::InvalidClient(_) => "invalid_client",
            OidcError::InvalidGrant(_) => "invalid_grant",
            OidcError::UnauthorizedClient(_) => "unauthorized_client",
            OidcError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OidcError::InvalidScope(_) => "invalid_scope",
            OidcError::InvalidToken(_) => "invalid_token",
            OidcError::InsufficientScope(_) => "insufficient_scope",
            OidcError::Internal(_) => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OidcError::InvalidClient(_) | OidcError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            OidcError::InsufficientScope(_) => StatusCode::FORBIDDEN,
            OidcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            OidcError::InvalidRequest(s)
            | OidcError::InvalidClient(s)
            | OidcError::InvalidGrant(s)
            | OidcError::UnauthorizedClient(s)
            | OidcError::UnsupportedGrantType(s)
            | OidcError::InvalidScope(s)
            | OidcError::InvalidToken(s)
            | OidcError::InsufficientScope(s)
            | OidcError::Internal(s) => s,
        }
    }
}

impl IntoResponse for OidcError {
    fn into_response(self) -> Response {
        let challenge = match &self {
            OidcError::InvalidToken(_) => Some(r#"Bearer error="invalid_token""#),
            OidcError::InsufficientScope(_) => Some(r#"Bearer error="insufficient_scope""#),
            _ => None,
        };
        let body = OidcErrorBody {
            error: self.error_code(),
            error_description: self.description().to_string(),
        };
        let mut resp = (self.status_code(), Json(body)).into_response();
        if let Some(challenge) = challenge {
            resp.headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        resp
    }
}

impl std::fmt::Display for OidcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.description())
    }
}

impl std::error::Error for OidcError {}

/// Failure to start an issuer.
#[derive(Debug)]
pub enum IssuerError {
    Config(ConfigError),
    KeyGeneration(String),
    SecretHashing(String),
    Signing(String),
}

impl std::fmt::Display for IssuerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuerError::Config(e) => write!(f, "invalid issuer configuration: {e}"),
            IssuerError::KeyGeneration(msg) => write!(f, "failed to generate signing key: {msg}"),
            IssuerError::SecretHashing(msg) => write!(f, "failed to hash secret: {msg}"),
            IssuerError::Signing(msg) => write!(f, "failed to sign token: {msg}"),
        }
    }
}

impl std::error::Error for IssuerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IssuerError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for IssuerError {
    fn from(err: ConfigError) -> Self {
        IssuerError::Config(err)
    }
}
