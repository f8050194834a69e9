use std::sync::Arc;

use authbed_security::bearer_token_from_headers;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::header::{self, AUTHORIZATION};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::{Form, Json};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{Client, GrantType, TestUser, OFFLINE_ACCESS};
use crate::error::OidcError;
use crate::grants::RefreshGrant;
use crate::scopes::{narrow_scopes, resolve_client_scopes, resolve_user_scopes};
use crate::state::{IssuerState, INTROSPECTION_PATH, JWKS_PATH, TOKEN_PATH, USERINFO_PATH};
use crate::token::{has_audience, now_secs, token_scopes, user_claim_value, TokenSubject};

/// RFC 6749 §5.1 required headers for token responses.
type TokenResponseHeaders = [(header::HeaderName, &'static str); 2];
const TOKEN_HEADERS: TokenResponseHeaders = [
    (header::CACHE_CONTROL, "no-store"),
    (header::PRAGMA, "no-cache"),
];

/// Token request parameters (form-urlencoded).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenRequest {
    pub grant_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scope: String,
}

fn form_error(rejection: FormRejection) -> OidcError {
    OidcError::InvalidRequest(rejection.body_text())
}

/// Credentials from HTTP Basic, falling back to form fields.
fn client_credentials(
    headers: &HeaderMap,
    form_id: Option<&str>,
    form_secret: Option<&str>,
) -> Result<(String, String), OidcError> {
    let basic = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Basic"));

    if let Some((_, encoded)) = basic {
        let decoded = STANDARD
            .decode(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| OidcError::InvalidClient("malformed Basic credentials".into()))?;
        let (id, secret) = decoded
            .split_once(':')
            .ok_or_else(|| OidcError::InvalidClient("malformed Basic credentials".into()))?;
        return Ok((id.to_string(), secret.to_string()));
    }

    match form_id {
        Some(id) if !id.is_empty() => Ok((id.to_string(), form_secret.unwrap_or_default().to_string())),
        _ => Err(OidcError::InvalidClient("missing client credentials".into())),
    }
}

/// POST /connect/token
pub(crate) async fn token_handler(
    State(state): State<Arc<IssuerState>>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<impl IntoResponse, OidcError> {
    let Form(req) = form.map_err(form_error)?;
    let (client_id, client_secret) = client_credentials(
        &headers,
        req.client_id.as_deref(),
        req.client_secret.as_deref(),
    )?;

    let client = state
        .clients
        .authenticate(&client_id, &client_secret)
        .await
        .ok_or_else(|| {
            warn!(%client_id, "Invalid client credentials");
            OidcError::InvalidClient("invalid client credentials".into())
        })?;

    let grant_type = req
        .grant_type
        .as_deref()
        .filter(|g| !g.is_empty())
        .ok_or_else(|| OidcError::InvalidRequest("missing 'grant_type' parameter".into()))?;
    let grant = GrantType::parse(grant_type).ok_or_else(|| {
        OidcError::UnsupportedGrantType(format!("grant_type '{grant_type}' is not supported"))
    })?;
    if !client.allows_grant(grant) {
        warn!(%client_id, grant_type, "Grant not allowed for client");
        return Err(OidcError::UnauthorizedClient(format!(
            "client '{client_id}' may not use the {grant_type} grant"
        )));
    }

    debug!(%client_id, grant_type, "Processing token request");
    let body = match grant {
        GrantType::Password => password_grant(&state, client, &req)?,
        GrantType::ClientCredentials => client_credentials_grant(&state, client, &req)?,
        GrantType::RefreshToken => refresh_token_grant(&state, client, &req)?,
    };
    // RFC 6749 §5.1: token responses MUST include Cache-Control: no-store.
    Ok((TOKEN_HEADERS, Json(body)))
}

fn password_grant(
    state: &IssuerState,
    client: &Client,
    req: &TokenRequest,
) -> Result<TokenResponse, OidcError> {
    let scopes = resolve_user_scopes(req.scope.as_deref(), client, &state.config)?;
    let username = req
        .username
        .as_deref()
        .ok_or_else(|| OidcError::InvalidRequest("missing 'username' parameter".into()))?;
    let password = req
        .password
        .as_deref()
        .ok_or_else(|| OidcError::InvalidRequest("missing 'password' parameter".into()))?;

    let user = state.users.authenticate(username, password).ok_or_else(|| {
        warn!(%username, "Invalid user credentials");
        OidcError::InvalidGrant("invalid username or password".into())
    })?;

    issue(state, client, Some(user), scopes, None)
}

fn client_credentials_grant(
    state: &IssuerState,
    client: &Client,
    req: &TokenRequest,
) -> Result<TokenResponse, OidcError> {
    let scopes = resolve_client_scopes(req.scope.as_deref(), client, &state.config)?;
    issue(state, client, None, scopes, None)
}

fn refresh_token_grant(
    state: &IssuerState,
    client: &Client,
    req: &TokenRequest,
) -> Result<TokenResponse, OidcError> {
    let handle = req
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OidcError::InvalidRequest("missing 'refresh_token' parameter".into()))?;

    let grant = state
        .refresh_tokens
        .redeem(handle, &client.client_id, now_secs()?)
        .ok_or_else(|| {
            warn!(client_id = %client.client_id, "Unknown, expired or reused refresh token");
            OidcError::InvalidGrant("invalid refresh token".into())
        })?;
    let scopes = narrow_scopes(req.scope.as_deref(), &grant.scopes)?;
    let user = state
        .users
        .find_by_subject(&grant.subject_id)
        .ok_or_else(|| OidcError::InvalidGrant("subject no longer exists".into()))?;

    issue(state, client, Some(user), scopes, Some(grant.auth_time))
}

fn issue(
    state: &IssuerState,
    client: &Client,
    user: Option<&TestUser>,
    scopes: Vec<String>,
    auth_time: Option<u64>,
) -> Result<TokenResponse, OidcError> {
    let now = now_secs()?;
    let (access_token, expires_in) = state.tokens.issue(&TokenSubject {
        client,
        user,
        scopes: &scopes,
        auth_time,
    })?;

    let refresh_token = match user {
        Some(user) if scopes.iter().any(|s| s == OFFLINE_ACCESS) => {
            let grant = RefreshGrant {
                client_id: client.client_id.clone(),
                subject_id: user.subject_id.clone(),
                scopes: scopes.clone(),
                auth_time: auth_time.unwrap_or(now),
                expires_at: now + state.config.refresh_token_ttl_secs,
            };
            Some(state.refresh_tokens.issue(grant, now))
        }
        _ => None,
    };

    debug!(
        client_id = %client.client_id,
        sub = user.map(|u| u.subject_id.as_str()).unwrap_or("-"),
        scope = %scopes.join(" "),
        "Issued access token"
    );
    Ok(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in,
        refresh_token,
        scope: scopes.join(" "),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntrospectionRequest {
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// POST /connect/introspect (RFC 7662), authenticated as the API resource.
pub(crate) async fn introspection_handler(
    State(state): State<Arc<IssuerState>>,
    headers: HeaderMap,
    form: Result<Form<IntrospectionRequest>, FormRejection>,
) -> Result<Json<Value>, OidcError> {
    let Form(req) = form.map_err(form_error)?;
    let (name, secret) = client_credentials(
        &headers,
        req.client_id.as_deref(),
        req.client_secret.as_deref(),
    )?;
    if !state.api.authenticate(&name, &secret).await {
        warn!(api = %name, "Invalid API credentials at introspection");
        return Err(OidcError::InvalidClient("invalid API credentials".into()));
    }

    let token = req
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OidcError::InvalidRequest("missing 'token' parameter".into()))?;

    let inactive = || Json(json!({ "active": false }));
    let mut claims = match state.tokens.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Introspected token is not active");
            return Ok(inactive());
        }
    };
    if !has_audience(&claims, &state.config.api_resource.name) {
        debug!("Introspected token is not for this API");
        return Ok(inactive());
    }

    let scope = token_scopes(&claims).join(" ");
    if let Some(obj) = claims.as_object_mut() {
        obj.insert("scope".into(), json!(scope));
        obj.insert("active".into(), json!(true));
    }
    Ok(Json(claims))
}

/// GET /connect/userinfo
pub(crate) async fn userinfo_handler(
    State(state): State<Arc<IssuerState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, OidcError> {
    let token = bearer_token_from_headers(&headers)
        .map_err(|e| OidcError::InvalidToken(e.to_string()))?;
    let claims = state
        .tokens
        .verify(token)
        .map_err(|e| OidcError::InvalidToken(format!("invalid token: {e}")))?;

    let scopes = token_scopes(&claims);
    if !scopes.iter().any(|s| s == "openid") {
        return Err(OidcError::InsufficientScope(
            "the openid scope is required".into(),
        ));
    }
    let sub = claims
        .get("sub")
        .and_then(Value::as_str)
        .ok_or_else(|| OidcError::InvalidToken("token has no subject".into()))?;
    let user = state
        .users
        .find_by_subject(sub)
        .ok_or_else(|| OidcError::InvalidToken("unknown subject".into()))?;

    let mut info = Map::new();
    info.insert("sub".into(), json!(user.subject_id));
    let released = scopes
        .iter()
        .filter_map(|scope| state.config.identity_resource(scope))
        .flat_map(|resource| resource.user_claims.iter())
        .filter(|claim_type| claim_type.as_str() != "sub");
    for claim_type in released {
        if let Some(value) = user_claim_value(user, claim_type) {
            info.insert(claim_type.clone(), value);
        }
    }
    Ok(Json(Value::Object(info)))
}

/// OpenID Connect discovery document.
#[derive(Serialize)]
pub(crate) struct DiscoveryDocument {
    issuer: String,
    jwks_uri: String,
    token_endpoint: String,
    userinfo_endpoint: String,
    introspection_endpoint: String,
    scopes_supported: Vec<String>,
    claims_supported: Vec<String>,
    grant_types_supported: Vec<&'static str>,
    response_types_supported: Vec<&'static str>,
    subject_types_supported: Vec<&'static str>,
    id_token_signing_alg_values_supported: Vec<&'static str>,
    token_endpoint_auth_methods_supported: Vec<&'static str>,
}

/// GET /.well-known/openid-configuration
pub(crate) async fn discovery_handler(
    State(state): State<Arc<IssuerState>>,
) -> Json<DiscoveryDocument> {
    let config = &state.config;

    let mut scopes_supported: Vec<String> =
        config.identity_resources.iter().map(|r| r.name.clone()).collect();
    scopes_supported.push(config.api_resource.name.clone());
    scopes_supported.push(OFFLINE_ACCESS.to_string());

    let mut claims_supported: Vec<String> = Vec::new();
    let all_claims = config
        .identity_resources
        .iter()
        .flat_map(|r| r.user_claims.iter())
        .chain(config.api_resource.user_claims.iter());
    for claim in all_claims {
        if !claims_supported.contains(claim) {
            claims_supported.push(claim.clone());
        }
    }

    Json(DiscoveryDocument {
        issuer: config.issuer_uri.clone(),
        jwks_uri: state.endpoint(JWKS_PATH),
        token_endpoint: state.endpoint(TOKEN_PATH),
        userinfo_endpoint: state.endpoint(USERINFO_PATH),
        introspection_endpoint: state.endpoint(INTROSPECTION_PATH),
        scopes_supported,
        claims_supported,
        grant_types_supported: vec![
            GrantType::Password.as_str(),
            GrantType::ClientCredentials.as_str(),
            GrantType::RefreshToken.as_str(),
        ],
        response_types_supported: vec!["token"],
        subject_types_supported: vec!["public"],
        id_token_signing_alg_values_supported: vec!["RS256"],
        token_endpoint_auth_methods_supported: vec!["client_secret_basic", "client_secret_post"],
    })
}

/// GET /.well-known/openid-configuration/jwks
pub(crate) async fn jwks_handler(State(state): State<Arc<IssuerState>>) -> impl IntoResponse {
    Json(state.key.jwks())
}
