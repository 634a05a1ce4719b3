//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use student_helper_core::ports::{ChatCompletionService, Clock, ConversationStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<dyn ConversationStore>,
    pub chat: Arc<dyn ChatCompletionService>,
    pub clock: Arc<dyn Clock>,
    /// Cancelled on server shutdown; each request works on a child token.
    pub shutdown: CancellationToken,
}
