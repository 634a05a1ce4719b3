//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ConversationStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use student_helper_core::domain::{ChatMessage, ContextCategory, Conversation};
use student_helper_core::ports::{ConversationStore, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ConversationStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ConversationRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    context_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    fn to_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            context_category: ContextCategory::parse(&self.context_type),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `ConversationStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ConversationStore for DbAdapter {
    async fn latest_conversation(
        &self,
        user_id: Uuid,
        category: ContextCategory,
    ) -> PortResult<Option<Conversation>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            "SELECT id, user_id, title, context_type, created_at, updated_at \
             FROM ai_conversations \
             WHERE user_id = $1 AND context_type = $2 \
             ORDER BY updated_at DESC \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(ConversationRecord::to_domain))
    }

    async fn save_exchange(
        &self,
        conversation: &Conversation,
        messages: &[ChatMessage],
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "INSERT INTO ai_conversations (id, user_id, title, context_type, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET updated_at = EXCLUDED.updated_at",
        )
        .bind(conversation.id)
        .bind(conversation.user_id)
        .bind(&conversation.title)
        .bind(conversation.context_category.as_str())
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        for message in messages {
            sqlx::query(
                "INSERT INTO ai_messages (id, conversation_id, content, is_user_message, ai_model, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(message.id)
            .bind(message.conversation_id)
            .bind(&message.content)
            .bind(message.is_user_message)
            .bind(&message.ai_model)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }
}
