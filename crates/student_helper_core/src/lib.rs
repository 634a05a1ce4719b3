pub mod domain;
pub mod ports;

pub use domain::{ChatMessage, Completion, ContextCategory, Conversation, PLACEHOLDER_COMPLETION};
pub use ports::{
    ChatCompletionService, ChatError, ChatResult, Clock, ConversationStore, PortError, PortResult,
    SystemClock,
};
