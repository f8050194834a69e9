//! Transport from an API host to its token issuer.
//!
//! The in-process variant dispatches requests straight into the issuer's
//! axum router with `oneshot`, so a whole harness runs without sockets.

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::ServiceExt;
use tracing::debug;

use crate::error::SecurityError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// How requests to the issuer are delivered.
#[derive(Clone)]
pub enum Backchannel {
    /// Real network requests.
    Http(reqwest::Client),
    /// Requests dispatched directly into the issuer's router.
    InProcess(Router),
}

/// Status and raw body of a backchannel response.
#[derive(Debug, Clone)]
pub struct BackchannelResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl BackchannelResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SecurityError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| SecurityError::Backchannel(format!("invalid JSON body: {e}")))
    }
}

impl std::fmt::Debug for Backchannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backchannel::Http(_) => f.write_str("Backchannel::Http"),
            Backchannel::InProcess(_) => f.write_str("Backchannel::InProcess"),
        }
    }
}

/// Value of an HTTP Basic `Authorization` header.
pub fn basic_auth_value(user: &str, password: &str) -> String {
    let encoded = STANDARD.encode(format!("{user}:{password}"));
    format!("Basic {encoded}")
}

impl Backchannel {
    pub fn http() -> Self {
        Backchannel::Http(reqwest::Client::new())
    }

    pub fn in_process(router: Router) -> Self {
        Backchannel::InProcess(router)
    }

    /// GET `url` and decode a successful JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SecurityError> {
        let resp = self.send(Method::GET, url, None, None).await?;
        if !resp.is_success() {
            return Err(SecurityError::Backchannel(format!(
                "GET {url} returned {}",
                resp.status
            )));
        }
        resp.json()
    }

    /// POST a urlencoded form, optionally authenticated with HTTP Basic.
    ///
    /// Non-2xx responses are returned as-is; OAuth2 endpoints carry error
    /// details in the body.
    pub async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        basic_auth: Option<(&str, &str)>,
    ) -> Result<BackchannelResponse, SecurityError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        let authorization = basic_auth.map(|(user, password)| basic_auth_value(user, password));
        self.send(Method::POST, url, Some(body), authorization).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        form: Option<String>,
        authorization: Option<String>,
    ) -> Result<BackchannelResponse, SecurityError> {
        debug!(%method, url, "backchannel request");
        match self {
            Backchannel::Http(client) => {
                let mut req = client.request(method, url);
                if let Some(value) = authorization {
                    req = req.header(AUTHORIZATION, value);
                }
                if let Some(body) = form {
                    req = req.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body);
                }
                let resp = req
                    .send()
                    .await
                    .map_err(|e| SecurityError::Backchannel(e.to_string()))?;
                let status = resp.status();
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| SecurityError::Backchannel(e.to_string()))?;
                Ok(BackchannelResponse { status, body })
            }
            Backchannel::InProcess(router) => {
                let mut builder = Request::builder().method(method).uri(url);
                if let Some(value) = authorization {
                    let value = HeaderValue::from_str(&value)
                        .map_err(|e| SecurityError::Backchannel(e.to_string()))?;
                    builder = builder.header(AUTHORIZATION, value);
                }
                let body = match form {
                    Some(body) => {
                        builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE);
                        Body::from(body)
                    }
                    None => Body::empty(),
                };
                let req = builder
                    .body(body)
                    .map_err(|e| SecurityError::Backchannel(e.to_string()))?;
                let resp = router
                    .clone()
                    .oneshot(req)
                    .await
                    .unwrap_or_else(|never| match never {});
                let status = resp.status();
                let body = resp
                    .into_body()
                    .collect()
                    .await
                    .map_err(|e| SecurityError::Backchannel(e.to_string()))?
                    .to_bytes();
                Ok(BackchannelResponse { status, body })
            }
        }
    }
}
