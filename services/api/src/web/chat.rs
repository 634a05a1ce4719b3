//! services/api/src/web/chat.rs
//!
//! The AI chat endpoint: asks the completion service and logs the exchange.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use student_helper_core::domain::{ChatMessage, ContextCategory, Conversation};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::{middleware::CurrentUser, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub message: String,
    /// One of `math`, `programming`, `lectures`, `general`. Anything else is `general`.
    #[serde(default)]
    pub context_type: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    pub answer: String,
    pub conversation_id: Uuid,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /helper/ai/chat - Ask the AI assistant a question
#[utoipa::path(
    post,
    path = "/helper/ai/chat",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Assistant answered", body = SendMessageResponse),
        (status = 400, description = "Empty message"),
        (status = 401, description = "Missing or invalid caller id"),
        (status = 403, description = "Caller is not registered"),
        (status = 503, description = "AI assistant is unavailable")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The authenticated user's id.")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message must not be empty".to_string()));
    }

    let category = ContextCategory::parse(req.context_type.as_deref().unwrap_or_default());
    info!(%user_id, %category, "AI chat request");

    // A failed lookup only costs conversation continuity.
    let existing = state
        .conversations
        .latest_conversation(user_id, category)
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to load latest conversation: {:?}", e);
            None
        });

    let cancel = state.shutdown.child_token();
    let completion = state
        .chat
        .get_completion(&req.message, category, &cancel)
        .await
        .map_err(|e| {
            error!(error = %e, "AI service error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "AI assistant is unavailable".to_string(),
            )
        })?;

    info!(chars = completion.text().chars().count(), "AI response received");

    let now = state.clock.now();
    let conversation = match existing {
        Some(mut conversation) if conversation.is_active_at(now) => {
            conversation.updated_at = now;
            conversation
        }
        _ => Conversation::start(user_id, category, &req.message, now),
    };

    let messages = [
        ChatMessage::from_user(conversation.id, &req.message, now),
        ChatMessage::from_model(conversation.id, completion.text(), state.chat.model_name(), now),
    ];

    if let Err(e) = state.conversations.save_exchange(&conversation, &messages).await {
        error!("Failed to save conversation: {:?}", e);
        warn!("Returning AI response despite database error");
    }

    let response = SendMessageResponse {
        answer: completion.into_text(),
        conversation_id: conversation.id,
        created_at: now,
    };
    Ok((StatusCode::OK, Json(response)))
}
