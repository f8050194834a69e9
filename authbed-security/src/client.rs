//! OAuth2 token endpoint client.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backchannel::Backchannel;

/// A client id/secret pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// How the client authenticates to the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientAuthStyle {
    /// `client_id`/`client_secret` form fields.
    #[default]
    PostBody,
    /// HTTP Basic `Authorization` header.
    Basic,
}

/// Successful token endpoint response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Failure to obtain a token.
#[derive(Debug)]
pub enum TokenError {
    /// The token endpoint answered with an OAuth2 error.
    Protocol {
        status: StatusCode,
        error: String,
        description: Option<String>,
    },
    /// The request did not complete, or the answer was not understood.
    Transport(String),
    /// The endpoint reported success without an access token.
    EmptyToken,
}

impl TokenError {
    /// The OAuth2 `error` code, when the endpoint supplied one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            TokenError::Protocol { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Protocol {
                status,
                error,
                description: Some(description),
            } => write!(f, "token request failed ({status}): {error}: {description}"),
            TokenError::Protocol { status, error, .. } => {
                write!(f, "token request failed ({status}): {error}")
            }
            TokenError::Transport(msg) => write!(f, "token request transport error: {msg}"),
            TokenError::EmptyToken => write!(f, "token endpoint returned an empty access token"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Requests tokens from a single token endpoint on behalf of one client.
#[derive(Clone, Debug)]
pub struct TokenClient {
    endpoint: String,
    credentials: ClientCredentials,
    auth_style: ClientAuthStyle,
    backchannel: Backchannel,
}

impl TokenClient {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: ClientCredentials,
        backchannel: Backchannel,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials,
            auth_style: ClientAuthStyle::default(),
            backchannel,
        }
    }

    pub fn with_auth_style(mut self, style: ClientAuthStyle) -> Self {
        self.auth_style = style;
        self
    }

    pub fn credentials(&self) -> &ClientCredentials {
        &self.credentials
    }

    /// Resource-owner password grant.
    pub async fn request_password_token(
        &self,
        username: &str,
        password: &str,
        scope: Option<&str>,
    ) -> Result<TokenResponse, TokenError> {
        let mut params = vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        if let Some(scope) = scope {
            params.push(("scope", scope));
        }
        self.request(params).await
    }

    pub async fn request_client_credentials_token(
        &self,
        scope: Option<&str>,
    ) -> Result<TokenResponse, TokenError> {
        let mut params = vec![("grant_type", "client_credentials")];
        if let Some(scope) = scope {
            params.push(("scope", scope));
        }
        self.request(params).await
    }

    pub async fn request_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, TokenError> {
        self.request(vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn request<'a>(
        &'a self,
        mut params: Vec<(&'a str, &'a str)>,
    ) -> Result<TokenResponse, TokenError> {
        let grant_type = params.first().map(|(_, v)| *v).unwrap_or_default();
        let basic = match self.auth_style {
            ClientAuthStyle::Basic => Some((
                self.credentials.client_id.as_str(),
                self.credentials.client_secret.as_str(),
            )),
            ClientAuthStyle::PostBody => {
                params.push(("client_id", self.credentials.client_id.as_str()));
                params.push(("client_secret", self.credentials.client_secret.as_str()));
                None
            }
        };

        let resp = self
            .backchannel
            .post_form(&self.endpoint, &params, basic)
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        if !resp.is_success() {
            let err = match serde_json::from_slice::<ErrorBody>(&resp.body) {
                Ok(body) => TokenError::Protocol {
                    status: resp.status,
                    error: body.error,
                    description: body.error_description,
                },
                Err(_) => TokenError::Transport(format!("token endpoint returned {}", resp.status)),
            };
            warn!(grant_type, client_id = %self.credentials.client_id, error = %err, "Token request failed");
            return Err(err);
        }

        let token: TokenResponse = serde_json::from_slice(&resp.body)
            .map_err(|e| TokenError::Transport(format!("invalid token response: {e}")))?;
        if token.access_token.is_empty() {
            return Err(TokenError::EmptyToken);
        }
        debug!(grant_type, client_id = %self.credentials.client_id, "Token issued");
        Ok(token)
    }
}
