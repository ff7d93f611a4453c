//! Repositories for database operations
//!
//! The api service reaches storage through two traits so the conversation
//! logic can run against Postgres in production and an in-memory store in
//! tests.

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Chat, Message, NewMessage, User};

pub mod chat;
#[cfg(test)]
pub mod memory;

pub use chat::ChatRepository;

/// Read access to the user directory
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by email address
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;
}

/// Chat registry and message log
///
/// Every chat-scoped read or write takes the owner id and filters on it in the
/// same statement, so a chat owned by someone else is simply not found.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Chats owned by a user, most recently updated first
    async fn list_chats(&self, owner_id: Uuid) -> DatabaseResult<Vec<Chat>>;

    /// Insert a new chat
    async fn create_chat(&self, owner_id: Uuid, title: &str) -> DatabaseResult<Chat>;

    /// Find a chat by id and owner
    async fn find_chat(&self, chat_id: Uuid, owner_id: Uuid) -> DatabaseResult<Option<Chat>>;

    /// Replace a chat title and refresh its update timestamp
    async fn rename_chat(
        &self,
        chat_id: Uuid,
        owner_id: Uuid,
        title: &str,
    ) -> DatabaseResult<Option<Chat>>;

    /// Bump the activity timestamps after an exchange
    ///
    /// `title` is written only when given; `None` keeps whatever title is
    /// stored at that moment, including a rename made during the exchange.
    async fn record_activity(
        &self,
        chat_id: Uuid,
        owner_id: Uuid,
        title: Option<&str>,
    ) -> DatabaseResult<Option<Chat>>;

    /// Delete a chat and all of its messages as one unit
    ///
    /// Returns `false` when no chat with that id belongs to the owner.
    async fn delete_chat(&self, chat_id: Uuid, owner_id: Uuid) -> DatabaseResult<bool>;

    /// Number of messages stored for a chat
    async fn count_messages(&self, chat_id: Uuid) -> DatabaseResult<i64>;

    /// Append a message to a chat
    async fn insert_message(&self, message: &NewMessage) -> DatabaseResult<Message>;

    /// Full transcript of a chat, oldest first
    async fn list_messages(&self, chat_id: Uuid) -> DatabaseResult<Vec<Message>>;

    /// The `limit` most recent messages of a chat other than `exclude`, oldest first
    async fn recent_messages(
        &self,
        chat_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> DatabaseResult<Vec<Message>>;

    /// Number of chats owned by a user
    async fn count_chats(&self, owner_id: Uuid) -> DatabaseResult<i64>;

    /// Number of messages across all chats owned by a user
    async fn count_owner_messages(&self, owner_id: Uuid) -> DatabaseResult<i64>;
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, image, credits, provider_id, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }
}
