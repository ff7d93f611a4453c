//! In-memory user accounts for the router tests

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{STARTING_CREDITS, UserAccounts};
use crate::models::{NewUser, User};

#[derive(Default, Clone)]
pub struct MemoryUsers {
    users: Arc<Mutex<Vec<User>>>,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl UserAccounts for MemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_or_create(&self, new_user: &NewUser) -> Result<User> {
        let mut users = self.users.lock().await;
        if let Some(existing) = users.iter().find(|u| u.email == new_user.email) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            image: new_user.image.clone(),
            credits: STARTING_CREDITS,
            provider_id: Some(new_user.provider_id.clone()),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }
}
