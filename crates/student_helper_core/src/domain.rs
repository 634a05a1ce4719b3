//! crates/student_helper_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// The user id that unauthenticated callers are mapped to. It never owns
/// conversations.
pub const ANONYMOUS_USER_ID: Uuid = Uuid::from_u128(1);

/// A conversation idle for longer than this is closed and a new one is started.
pub const CONVERSATION_IDLE_MINUTES: i64 = 60;

const TITLE_MAX_CHARS: usize = 50;
const TITLE_TRUNCATED_CHARS: usize = 47;

//=========================================================================================
// Context Category
//=========================================================================================

/// Selects which fixed system prompt frames a completion request.
///
/// Parsing never fails: anything that is not one of the known tags is
/// `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContextCategory {
    Math,
    Programming,
    Lectures,
    #[default]
    General,
}

impl ContextCategory {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "math" => Self::Math,
            "programming" => Self::Programming,
            "lectures" => Self::Lectures,
            _ => Self::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Programming => "programming",
            Self::Lectures => "lectures",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for ContextCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Completion Outcome
//=========================================================================================

/// Text shown when the provider answered successfully but with an unusable body.
pub const PLACEHOLDER_COMPLETION: &str = "No response from AI";

/// The successful outcome of a completion call.
///
/// `Placeholder` is a success: the provider returned 2xx but the body did not
/// carry `choices[0].message.content`. Callers still get a displayable string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Generated(String),
    Placeholder,
}

impl Completion {
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text,
            Self::Placeholder => PLACEHOLDER_COMPLETION,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text) => text,
            Self::Placeholder => PLACEHOLDER_COMPLETION.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

//=========================================================================================
// Conversation Log
//=========================================================================================

/// A chat thread between one user and the assistant, scoped to a category.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub context_category: ContextCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Starts a new conversation titled after its first message.
    pub fn start(
        user_id: Uuid,
        context_category: ContextCategory,
        first_message: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title: conversation_title(first_message),
            context_category,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a new message at `now` may still be appended to this conversation.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now - self.updated_at <= Duration::minutes(CONVERSATION_IDLE_MINUTES)
    }
}

/// A single message in a conversation, written by the user or by the model.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub is_user_message: bool,
    pub ai_model: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn from_user(conversation_id: Uuid, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            content: content.to_string(),
            is_user_message: true,
            ai_model: "user".to_string(),
            created_at: now,
        }
    }

    pub fn from_model(
        conversation_id: Uuid,
        content: &str,
        ai_model: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            content: content.to_string(),
            is_user_message: false,
            ai_model: ai_model.to_string(),
            created_at: now,
        }
    }
}

fn conversation_title(message: &str) -> String {
    if message.chars().count() > TITLE_MAX_CHARS {
        let head: String = message.chars().take(TITLE_TRUNCATED_CHARS).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}
