//! API models for request and response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub mod chat;

pub use chat::{Chat, ChatTranscript, Exchange, Message, MessageRole, NewMessage};

/// User record as seen by the api service
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub credits: i32,
    #[serde(skip_serializing)]
    pub provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity resolved by the auth middleware
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Request for chat creation
#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

/// Request for chat rename
#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    pub title: Option<String>,
}

/// Request for sending a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
}

/// Per-user usage counters
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageStats {
    pub total_chats: i64,
    pub total_messages: i64,
}
