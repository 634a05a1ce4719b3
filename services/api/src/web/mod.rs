pub mod chat;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use chat::send_message_handler;
pub use middleware::require_user;
use state::AppState;

/// Builds the API routes. CORS and Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no caller id required)
    let public_routes = Router::new()
        .route("/", get(rest::root_handler))
        .route("/health", get(rest::health_handler));

    // Protected routes (caller id required)
    let protected_routes = Router::new()
        .route("/helper/ai/chat", post(send_message_handler))
        .layer(axum_middleware::from_fn(require_user));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
