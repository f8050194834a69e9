use authbed_core::HttpError;
use authbed_security::AuthenticatedUser;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use crate::models::{Value, ValueRequest};
use crate::services::ValueService;

/// GET /api/values
pub async fn list(State(values): State<ValueService>) -> Json<Vec<Value>> {
    Json(values.list().await)
}

/// GET /api/values/{id}
pub async fn get_by_id(
    State(values): State<ValueService>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, HttpError> {
    values
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| HttpError::NotFound(format!("value {id} not found")))
}

/// POST /api/values
pub async fn create(
    State(values): State<ValueService>,
    user: AuthenticatedUser,
    body: String,
) -> Json<Value> {
    let value = values.create(ValueRequest::from_body(&body)).await;
    debug!(sub = %user.sub, id = value.id, "Value created");
    Json(value)
}

/// PUT /api/values/{id}
pub async fn update(
    State(values): State<ValueService>,
    Path(id): Path<u64>,
    body: String,
) -> Json<Value> {
    Json(values.put(id, ValueRequest::from_body(&body)).await)
}

/// DELETE /api/values/{id}. Deleting a missing value still succeeds.
pub async fn delete(
    State(values): State<ValueService>,
    user: AuthenticatedUser,
    Path(id): Path<u64>,
) -> Json<JsonValue> {
    let deleted = values.delete(id).await;
    info!(sub = %user.sub, id, deleted, "Value delete requested");
    Json(json!({ "id": id, "deleted": deleted }))
}

/// GET /api/identity
pub async fn identity(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
