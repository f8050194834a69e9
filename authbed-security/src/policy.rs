//! Route middleware enforcing an [`AuthorizationPolicy`].

use std::sync::Arc;

use authbed_core::{Guard, GuardContext};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::extractor::authenticate_headers;
use crate::guards::AuthorizationPolicy;
use crate::validator::ClaimsValidator;

/// State for [`enforce_policy`]: the validator plus the rule for one route.
#[derive(Clone)]
pub struct PolicyGate {
    validator: Arc<ClaimsValidator>,
    policy: AuthorizationPolicy,
}

impl PolicyGate {
    pub fn new(validator: Arc<ClaimsValidator>, policy: AuthorizationPolicy) -> Self {
        Self { validator, policy }
    }

    pub fn policy(&self) -> AuthorizationPolicy {
        self.policy
    }
}

/// Authenticate the request if the policy needs it, then apply the policy.
///
/// On success the caller's [`AuthenticatedUser`](crate::AuthenticatedUser) is stored in the request
/// extensions. Anonymous routes never look at the Authorization header.
///
/// ```ignore
/// Router::new().route(
///     "/api/values",
///     post(create).route_layer(middleware::from_fn_with_state(
///         PolicyGate::new(validator, AuthorizationPolicy::Authenticated),
///         enforce_policy,
///     )),
/// )
/// ```
pub async fn enforce_policy(State(gate): State<PolicyGate>, req: Request, next: Next) -> Response {
    if !gate.policy.requires_identity() {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let identity = match authenticate_headers(&gate.validator, &parts.headers).await {
        Ok(user) => Some(user),
        Err(e) => {
            debug!(uri = %parts.uri, error = %e, "No valid identity");
            None
        }
    };

    let ctx = GuardContext {
        method: &parts.method,
        uri: &parts.uri,
        headers: &parts.headers,
        identity: identity.as_ref(),
    };
    if let Err(resp) = gate.policy.check(&ctx).await {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            policy = ?gate.policy,
            status = %resp.status(),
            "Request denied"
        );
        return resp;
    }

    if let Some(user) = identity {
        parts.extensions.insert(user);
    }
    next.run(Request::from_parts(parts, body)).await
}
