//! Postgres-backed chat registry and message log

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::ChatStore;
use crate::models::{Chat, Message, MessageRole, NewMessage};

/// Chat repository for database operations
#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    /// Create a new chat repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn message_from_row(row: &PgRow) -> DatabaseResult<Message> {
    let role: String = row.get("role");
    let role = role.parse::<MessageRole>().map_err(DatabaseError::Corrupt)?;

    Ok(Message {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        user_id: row.get("user_id"),
        role,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ChatStore for ChatRepository {
    async fn list_chats(&self, owner_id: Uuid) -> DatabaseResult<Vec<Chat>> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, user_id, title, last_message_at, created_at, updated_at
            FROM chats
            WHERE user_id = $1
            ORDER BY updated_at DESC, created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn create_chat(&self, owner_id: Uuid, title: &str) -> DatabaseResult<Chat> {
        sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (id, user_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, last_message_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_chat(&self, chat_id: Uuid, owner_id: Uuid) -> DatabaseResult<Option<Chat>> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, user_id, title, last_message_at, created_at, updated_at
            FROM chats
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn rename_chat(
        &self,
        chat_id: Uuid,
        owner_id: Uuid,
        title: &str,
    ) -> DatabaseResult<Option<Chat>> {
        sqlx::query_as::<_, Chat>(
            r#"
            UPDATE chats
            SET title = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, last_message_at, created_at, updated_at
            "#,
        )
        .bind(chat_id)
        .bind(owner_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn record_activity(
        &self,
        chat_id: Uuid,
        owner_id: Uuid,
        title: Option<&str>,
    ) -> DatabaseResult<Option<Chat>> {
        sqlx::query_as::<_, Chat>(
            r#"
            UPDATE chats
            SET title = COALESCE($3, title), last_message_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, last_message_at, created_at, updated_at
            "#,
        )
        .bind(chat_id)
        .bind(owner_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn delete_chat(&self, chat_id: Uuid, owner_id: Uuid) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        let owned = sqlx::query("SELECT id FROM chats WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(chat_id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DatabaseError::Query)?;

        if owned.is_none() {
            return Ok(false);
        }

        let messages = sqlx::query("DELETE FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::Query)?;

        sqlx::query("DELETE FROM chats WHERE id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::Query)?;

        tx.commit().await.map_err(DatabaseError::Query)?;

        info!(
            "Deleted chat {} with {} messages",
            chat_id,
            messages.rows_affected()
        );
        Ok(true)
    }

    async fn count_messages(&self, chat_id: Uuid) -> DatabaseResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn insert_message(&self, message: &NewMessage) -> DatabaseResult<Message> {
        // NOW() is frozen per transaction, clock_timestamp() is not
        let row = sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, user_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5, clock_timestamp())
            RETURNING id, chat_id, user_id, role, content, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.chat_id)
        .bind(message.user_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        message_from_row(&row)
    }

    async fn list_messages(&self, chat_id: Uuid) -> DatabaseResult<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, user_id, role, content, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(message_from_row).collect()
    }

    async fn recent_messages(
        &self,
        chat_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> DatabaseResult<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, user_id, role, content, created_at
            FROM (
                SELECT id, seq, chat_id, user_id, role, content, created_at
                FROM messages
                WHERE chat_id = $1 AND id <> $2
                ORDER BY created_at DESC, seq DESC
                LIMIT $3
            ) recent
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(chat_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(message_from_row).collect()
    }

    async fn count_chats(&self, owner_id: Uuid) -> DatabaseResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chats WHERE user_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn count_owner_messages(&self, owner_id: Uuid) -> DatabaseResult<i64> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN chats c ON c.id = m.chat_id
            WHERE c.user_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }
}
