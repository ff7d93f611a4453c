//! Session management: pending sign-ins in Redis, session tokens via the shared service

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use common::{
    cache::RedisPool,
    session::{IssuedSession, SessionClaims, SessionError, SessionService},
};
use tracing::info;

use crate::{models::User, oauth::OAuthSession};

/// Lifetime of a pending sign-in: 10 minutes
pub const PENDING_TTL_SECONDS: u64 = 600;

/// Storage for sign-ins between the provider redirect and its callback
#[async_trait]
pub trait PendingSignIns: Send + Sync {
    async fn store(&self, session: &OAuthSession, ttl_seconds: u64) -> Result<()>;

    /// Remove and return the pending sign-in for a CSRF token, at most once
    async fn take(&self, csrf_token: &str) -> Result<Option<OAuthSession>>;
}

fn pending_key(csrf_token: &str) -> String {
    format!("oauth_state:{}", csrf_token)
}

#[async_trait]
impl PendingSignIns for RedisPool {
    async fn store(&self, session: &OAuthSession, ttl_seconds: u64) -> Result<()> {
        let value = serde_json::to_string(session)?;
        self.set(&pending_key(&session.csrf_token), &value, Some(ttl_seconds))
            .await
    }

    async fn take(&self, csrf_token: &str) -> Result<Option<OAuthSession>> {
        match RedisPool::take(self, &pending_key(csrf_token)).await? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }
}

/// Session manager for sign-in state and user sessions
#[derive(Clone)]
pub struct SessionManager {
    pending: Arc<dyn PendingSignIns>,
    tokens: SessionService,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(pending: Arc<dyn PendingSignIns>, tokens: SessionService) -> Self {
        Self { pending, tokens }
    }

    /// Remember a sign-in until its callback arrives
    pub async fn begin_sign_in(&self, session: &OAuthSession) -> Result<()> {
        self.pending.store(session, PENDING_TTL_SECONDS).await
    }

    /// Consume the pending sign-in matching the callback state
    pub async fn complete_sign_in(&self, csrf_token: &str) -> Result<Option<OAuthSession>> {
        self.pending.take(csrf_token).await
    }

    /// Create a new session for a user
    pub fn create_session(&self, user: &User) -> Result<IssuedSession, SessionError> {
        info!("Creating session for user: {}", user.id);
        self.tokens.issue(user.id, &user.email)
    }

    /// Check a presented session token
    pub async fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        self.tokens.verify(token).await
    }

    /// End a session before it expires
    pub async fn revoke(&self, claims: &SessionClaims) -> Result<(), SessionError> {
        info!("Revoking session for user: {}", claims.sub);
        self.tokens.revoke(claims).await
    }
}
