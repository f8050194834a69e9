use std::future::{ready, Future};

use authbed_core::{Guard, GuardContext, HttpError, Identity};
use axum::response::{IntoResponse, Response};

fn unauthorized() -> Response {
    HttpError::Unauthorized("Unauthorized".into()).into_response()
}

fn require_roles<I: Identity>(identity: &I, required: &[&str]) -> Result<(), Response> {
    let roles = identity.roles();
    let has_role = required
        .iter()
        .any(|req| roles.iter().any(|r| r.as_str() == *req));
    if has_role {
        Ok(())
    } else {
        Err(HttpError::Forbidden("Insufficient roles".into()).into_response())
    }
}

/// Per-route authorization rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationPolicy {
    /// No token needed; any Authorization header is ignored.
    Anonymous,
    /// Any valid token.
    Authenticated,
    /// A valid token carrying at least one of these roles.
    Roles(&'static [&'static str]),
}

impl AuthorizationPolicy {
    pub fn requires_identity(&self) -> bool {
        !matches!(self, AuthorizationPolicy::Anonymous)
    }
}

/// Missing identity is 401 for every non-anonymous policy; a missing role is 403.
impl<I: Identity> Guard<I> for AuthorizationPolicy {
    fn check(&self, ctx: &GuardContext<'_, I>) -> impl Future<Output = Result<(), Response>> + Send {
        let result = match (self, ctx.identity) {
            (AuthorizationPolicy::Anonymous, _) => Ok(()),
            (_, None) => Err(unauthorized()),
            (AuthorizationPolicy::Authenticated, Some(_)) => Ok(()),
            (AuthorizationPolicy::Roles(required), Some(identity)) => {
                require_roles(identity, required)
            }
        };
        ready(result)
    }
}
