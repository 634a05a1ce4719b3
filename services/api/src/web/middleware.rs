//! services/api/src/web/middleware.rs
//!
//! Caller identity middleware for protecting routes.
//!
//! Authentication happens in front of this service; the gateway forwards the
//! verified user id in the `x-user-id` header.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use student_helper_core::domain::ANONYMOUS_USER_ID;
use tracing::warn;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller, inserted into request extensions by `require_user`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

/// Middleware that resolves the caller's user id.
///
/// Missing or malformed ids are rejected with 401. The anonymous placeholder id
/// belongs to no registered user and is rejected with 403.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if user_id == ANONYMOUS_USER_ID {
        warn!("Rejected request from unregistered placeholder user");
        return Err(StatusCode::FORBIDDEN);
    }

    req.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(req).await)
}
