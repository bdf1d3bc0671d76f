//! HTTP API layer for the FoodTrack notification service.
//!
//! - **Endpoints**: notification history, preferences, push subscriptions
//! - **Extractors**: authenticated user
//! - **Middleware**: bearer token authentication
//! - **Streaming**: per-user WebSocket channel
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod streaming;

use axum::{Router, middleware::from_fn_with_state, routing::get};

pub use endpoints::{health, router};
pub use middleware::AppState;
pub use streaming::streaming_handler;

/// Build the application router: `/api/...`, `/ws` and `/health`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(streaming_handler))
        .nest("/api", router())
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
