//! crates/student_helper_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{ChatMessage, Completion, ContextCategory, Conversation};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for persistence port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures of the chat completion port.
///
/// A malformed body on the completion path is not an error; it becomes
/// `Completion::Placeholder`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Failed to acquire access token: {0}")]
    CredentialAcquisitionFailed(String),
    #[error("Completion request failed with status {status}")]
    CompletionRequestFailed { status: u16 },
    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),
    #[error("Request to the AI provider timed out")]
    Timeout,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Message must not be empty")]
    EmptyMessage,
}

pub type ChatResult<T> = Result<T, ChatError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Produces a completion for `message`, framed by the system prompt of
    /// `category`. Resolves `ChatError::Cancelled` once `cancel` fires.
    async fn get_completion(
        &self,
        message: &str,
        category: ContextCategory,
        cancel: &CancellationToken,
    ) -> ChatResult<Completion>;

    /// The model tag recorded next to generated messages.
    fn model_name(&self) -> &str;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The most recently updated conversation of `user_id` in `category`, if any.
    async fn latest_conversation(
        &self,
        user_id: Uuid,
        category: ContextCategory,
    ) -> PortResult<Option<Conversation>>;

    /// Upserts `conversation` and appends `messages` to it atomically.
    async fn save_exchange(
        &self,
        conversation: &Conversation,
        messages: &[ChatMessage],
    ) -> PortResult<()>;
}

/// Source of wall-clock time, injectable so expiry logic can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
