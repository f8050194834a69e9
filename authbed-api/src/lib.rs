//! A deliberately small protected API: a list of values with anonymous
//! reads, authenticated writes and admin-only deletes.
//!
//! The host never talks to the issuer directly. It receives a
//! [`Backchannel`], so tests can hand it an in-process router.

pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use authbed_security::{
    enforce_policy, AuthorizationPolicy, Backchannel, ClaimsValidator, PolicyGate,
    SecurityConfig, SecurityError,
};
use axum::middleware;
use axum::routing::{delete, get, post, put, MethodRouter};
use axum::Router;
use tracing::info;

pub use models::{Value, ValueRequest};
pub use services::ValueService;
pub use state::ValuesState;

pub const ADMIN_ROLE: &str = "admin";
const ADMIN_ONLY: AuthorizationPolicy = AuthorizationPolicy::Roles(&[ADMIN_ROLE]);

/// Discover the issuer through `backchannel` and build the API router.
pub async fn build(
    config: SecurityConfig,
    backchannel: Backchannel,
) -> Result<Router, SecurityError> {
    let validator = ClaimsValidator::discover(config, backchannel).await?;
    info!(
        authority = %validator.config().authority,
        audience = %validator.config().audience,
        "Values API ready"
    );
    Ok(router(Arc::new(validator)))
}

/// Build the API router around an existing validator.
pub fn router(validator: Arc<ClaimsValidator>) -> Router {
    router_with_values(validator, ValueService::new())
}

/// Apply `policy` to every method in `route`.
fn guarded(
    validator: &Arc<ClaimsValidator>,
    policy: AuthorizationPolicy,
    route: MethodRouter<ValuesState>,
) -> MethodRouter<ValuesState> {
    route.route_layer(middleware::from_fn_with_state(
        PolicyGate::new(validator.clone(), policy),
        enforce_policy,
    ))
}

/// Like [`router`], with a caller-provided value store.
pub fn router_with_values(validator: Arc<ClaimsValidator>, values: ValueService) -> Router {
    let state = ValuesState {
        validator: validator.clone(),
        values,
    };

    let authenticated = AuthorizationPolicy::Authenticated;
    let router = Router::new()
        .route(
            "/api/values",
            get(handlers::list).merge(guarded(&validator, authenticated, post(handlers::create))),
        )
        .route(
            "/api/values/{id}",
            get(handlers::get_by_id)
                .merge(guarded(&validator, authenticated, put(handlers::update)))
                .merge(guarded(&validator, ADMIN_ONLY, delete(handlers::delete))),
        )
        .route(
            "/api/identity",
            guarded(&validator, authenticated, get(handlers::identity)),
        )
        .with_state(state);

    authbed_core::with_default_layers(router)
}
