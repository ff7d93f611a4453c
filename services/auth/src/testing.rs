//! Test fixtures for the router tests

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use common::session::{InMemoryRevocations, SessionConfig, SessionService};
use tokio::sync::Mutex;

use crate::{
    AppState,
    oauth::{OAuthClient, OAuthConfig, OAuthSession},
    repositories::memory::MemoryUsers,
    session::{PendingSignIns, SessionManager},
};

/// Pending sign-ins held in process memory; TTLs are not enforced
#[derive(Default)]
pub struct MemoryPending {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl PendingSignIns for MemoryPending {
    async fn store(&self, session: &OAuthSession, _ttl_seconds: u64) -> Result<()> {
        let value = serde_json::to_string(session)?;
        self.entries
            .lock()
            .await
            .insert(session.csrf_token.clone(), value);
        Ok(())
    }

    async fn take(&self, csrf_token: &str) -> Result<Option<OAuthSession>> {
        match self.entries.lock().await.remove(csrf_token) {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }
}

/// Auth service state with Google endpoints pointed at `google_base`
pub struct TestApp {
    pub state: AppState,
    pub users: MemoryUsers,
}

impl TestApp {
    pub fn new(google_base: &str) -> Self {
        let users = MemoryUsers::new();

        let tokens = SessionService::new(
            &SessionConfig {
                secret: "auth-router-test-secret-long-enough".to_string(),
                ttl_seconds: 3600,
            },
            Arc::new(InMemoryRevocations::new()),
        );

        let oauth = OAuthClient::new_google(OAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret-456".to_string(),
            redirect_url: "http://localhost:3000/auth/google/callback".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: format!("{}/token", google_base),
            userinfo_url: format!("{}/userinfo", google_base),
        })
        .unwrap();

        let state = AppState {
            users: Arc::new(users.clone()),
            sessions: SessionManager::new(Arc::new(MemoryPending::default()), tokens),
            oauth,
        };

        Self { state, users }
    }
}
