//! In-memory store used by the unit and router tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ChatStore, UserDirectory};
use crate::models::{Chat, Message, NewMessage, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    chats: HashMap<Uuid, (u64, Chat)>,
    messages: Vec<Message>,
    next_seq: u64,
}

/// Users, chats and messages held in process memory
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user as the auth service would on first sign-in
    pub async fn add_user(&self, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: Some("Test Grower".to_string()),
            image: None,
            credits: 100,
            provider_id: Some("google-sub".to_string()),
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.users.push(user.clone());
        user
    }

    /// Make every subsequent operation fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every message row regardless of chat, in insertion order
    pub async fn all_messages(&self) -> Vec<Message> {
        self.tables.lock().await.messages.clone()
    }

    fn check(&self) -> DatabaseResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl Tables {
    fn owned_chat(&mut self, chat_id: Uuid, owner_id: Uuid) -> Option<&mut Chat> {
        self.chats
            .get_mut(&chat_id)
            .map(|(_, chat)| chat)
            .filter(|chat| chat.user_id == owner_id)
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn list_chats(&self, owner_id: Uuid) -> DatabaseResult<Vec<Chat>> {
        self.check()?;
        let tables = self.tables.lock().await;
        let mut chats: Vec<&(u64, Chat)> = tables
            .chats
            .values()
            .filter(|(_, chat)| chat.user_id == owner_id)
            .collect();
        chats.sort_by(|(a_seq, a), (b_seq, b)| {
            b.updated_at.cmp(&a.updated_at).then(b_seq.cmp(a_seq))
        });
        Ok(chats.into_iter().map(|(_, chat)| chat.clone()).collect())
    }

    async fn create_chat(&self, owner_id: Uuid, title: &str) -> DatabaseResult<Chat> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            user_id: owner_id,
            title: title.to_string(),
            last_message_at: now,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.bump_seq();
        tables.chats.insert(chat.id, (seq, chat.clone()));
        Ok(chat)
    }

    async fn find_chat(&self, chat_id: Uuid, owner_id: Uuid) -> DatabaseResult<Option<Chat>> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        Ok(tables.owned_chat(chat_id, owner_id).map(|chat| chat.clone()))
    }

    async fn rename_chat(
        &self,
        chat_id: Uuid,
        owner_id: Uuid,
        title: &str,
    ) -> DatabaseResult<Option<Chat>> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let seq = tables.bump_seq();
        let Some((entry_seq, chat)) = tables
            .chats
            .get_mut(&chat_id)
            .filter(|(_, chat)| chat.user_id == owner_id)
        else {
            return Ok(None);
        };
        chat.title = title.to_string();
        chat.updated_at = Utc::now();
        *entry_seq = seq;
        Ok(Some(chat.clone()))
    }

    async fn record_activity(
        &self,
        chat_id: Uuid,
        owner_id: Uuid,
        title: Option<&str>,
    ) -> DatabaseResult<Option<Chat>> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let seq = tables.bump_seq();
        let Some((entry_seq, chat)) = tables
            .chats
            .get_mut(&chat_id)
            .filter(|(_, chat)| chat.user_id == owner_id)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        if let Some(title) = title {
            chat.title = title.to_string();
        }
        chat.last_message_at = now;
        chat.updated_at = now;
        *entry_seq = seq;
        Ok(Some(chat.clone()))
    }

    async fn delete_chat(&self, chat_id: Uuid, owner_id: Uuid) -> DatabaseResult<bool> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if tables.owned_chat(chat_id, owner_id).is_none() {
            return Ok(false);
        }
        tables.messages.retain(|m| m.chat_id != chat_id);
        tables.chats.remove(&chat_id);
        Ok(true)
    }

    async fn count_messages(&self, chat_id: Uuid) -> DatabaseResult<i64> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.messages.iter().filter(|m| m.chat_id == chat_id).count() as i64)
    }

    async fn insert_message(&self, message: &NewMessage) -> DatabaseResult<Message> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        if !tables.chats.contains_key(&message.chat_id) {
            return Err(DatabaseError::Query(sqlx::Error::RowNotFound));
        }
        let stored = Message {
            id: Uuid::new_v4(),
            chat_id: message.chat_id,
            user_id: message.user_id,
            role: message.role,
            content: message.content.clone(),
            created_at: Utc::now(),
        };
        tables.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, chat_id: Uuid) -> DatabaseResult<Vec<Message>> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn recent_messages(
        &self,
        chat_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> DatabaseResult<Vec<Message>> {
        self.check()?;
        let tables = self.tables.lock().await;
        let matching: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id && m.id != exclude)
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit.max(0) as usize);
        Ok(matching.into_iter().skip(skip).collect())
    }

    async fn count_chats(&self, owner_id: Uuid) -> DatabaseResult<i64> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .chats
            .values()
            .filter(|(_, chat)| chat.user_id == owner_id)
            .count() as i64)
    }

    async fn count_owner_messages(&self, owner_id: Uuid) -> DatabaseResult<i64> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| {
                tables
                    .chats
                    .get(&m.chat_id)
                    .is_some_and(|(_, chat)| chat.user_id == owner_id)
            })
            .count() as i64)
    }
}
