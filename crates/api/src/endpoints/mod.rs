//! API endpoints.

mod notifications;

use axum::{Json, Router};
use serde_json::{Value, json};

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().nest("/notifications", notifications::router())
}

/// Liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
