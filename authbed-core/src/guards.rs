use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;

/// Trait representing an authenticated identity (user, service client, etc.).
///
/// Guards are written against this trait rather than a concrete identity
/// struct so that test doubles can stand in for real token identities.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Identity`",
    label = "this type cannot be used as an identity",
    note = "implement `Identity` for your type, or use `AuthenticatedUser` from `authbed-security` which implements it"
)]
pub trait Identity: Send + Sync {
    /// Unique subject identifier (e.g. JWT "sub" claim).
    fn sub(&self) -> &str;

    /// Roles associated with this identity.
    fn roles(&self) -> &[String];

    /// Raw token claims, if available.
    fn claims(&self) -> Option<&serde_json::Value> {
        None
    }
}

/// Context available to guards before the handler runs.
pub struct GuardContext<'a, I: Identity> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub identity: Option<&'a I>,
}

/// Route-level guard. Returns `Ok(())` to proceed, `Err(Response)` to short-circuit.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Guard<{I}>`",
    label = "this type cannot be used as a guard"
)]
pub trait Guard<I: Identity>: Send + Sync {
    fn check(
        &self,
        ctx: &GuardContext<'_, I>,
    ) -> impl std::future::Future<Output = Result<(), Response>> + Send;
}
