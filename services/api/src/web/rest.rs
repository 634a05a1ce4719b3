//! services/api/src/web/rest.rs
//!
//! Service-level endpoints and the master definition for the OpenAPI
//! specification.

use utoipa::OpenApi;

use crate::web::chat::{SendMessageRequest, SendMessageResponse};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::chat::send_message_handler,
        health_handler,
    ),
    components(
        schemas(SendMessageRequest, SendMessageResponse)
    ),
    tags(
        (name = "Student Helper API", description = "AI assistant endpoints for students.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Handlers
//=========================================================================================

pub async fn root_handler() -> &'static str {
    "Student Helper API with GigaChat is running!"
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
pub async fn health_handler() -> &'static str {
    "Healthy"
}
