//! Chat and message models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Title every chat starts with until it is renamed or auto-titled
pub const DEFAULT_CHAT_TITLE: &str = "New chat";

/// Characters of the first message kept when deriving a title
pub const AUTO_TITLE_MAX_CHARS: usize = 50;

const AUTO_TITLE_ELLIPSIS: &str = "...";

/// Conversation container owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Chat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Whether the title was never changed from the default
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CHAT_TITLE
    }
}

/// Derive a chat title from the first message of a conversation
pub fn auto_title(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(AUTO_TITLE_MAX_CHARS).collect();

    if chars.next().is_some() {
        format!("{}{}", head, AUTO_TITLE_ELLIPSIS)
    } else {
        head
    }
}

/// Author of a message turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("unknown message role: {}", other)),
        }
    }
}

/// One stored turn of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    /// Present for user turns, absent for assistant turns
    pub user_id: Option<Uuid>,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Message insertion payload
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub user_id: Option<Uuid>,
    pub role: MessageRole,
    pub content: String,
}

impl NewMessage {
    pub fn from_user(chat_id: Uuid, user_id: Uuid, content: &str) -> Self {
        Self {
            chat_id,
            user_id: Some(user_id),
            role: MessageRole::User,
            content: content.to_string(),
        }
    }

    pub fn from_assistant(chat_id: Uuid, content: String) -> Self {
        Self {
            chat_id,
            user_id: None,
            role: MessageRole::Assistant,
            content,
        }
    }
}

/// Result of one send-message round trip
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user_message: Message,
    pub assistant_message: Message,
    pub chat: Chat,
}

/// A chat together with its full transcript
#[derive(Debug, Clone, Serialize)]
pub struct ChatTranscript {
    pub chat: Chat,
    pub messages: Vec<Message>,
}
