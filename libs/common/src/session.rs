//! Session tokens shared by the auth and api services
//!
//! A session is an HS256-signed token bound to a user id and email address.
//! The auth service issues and revokes them; the api service only verifies.
//! Revoked token ids are kept on a [`RevocationList`] until the token would
//! have expired anyway.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::cache::RedisPool;

/// Default session lifetime: 7 days
const DEFAULT_TTL_SECONDS: u64 = 604_800;

/// Shortest secret accepted for signing
const MIN_SECRET_LEN: usize = 32;

/// Errors raised while issuing or checking sessions
#[derive(Error, Debug)]
pub enum SessionError {
    /// Missing or unusable configuration
    #[error("Session configuration error: {0}")]
    Configuration(String),

    /// Token is malformed, badly signed or expired
    #[error("Invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    /// Token was explicitly revoked
    #[error("Session has been revoked")]
    Revoked,

    /// The revocation list could not be consulted
    #[error("Session store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC secret used to sign tokens
    pub secret: String,
    /// Token lifetime in seconds
    pub ttl_seconds: u64,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_SECRET`: signing secret, at least 32 bytes (required)
    /// - `SESSION_TTL_SECONDS`: token lifetime (default: 604800)
    pub fn from_env() -> Result<Self, SessionError> {
        let secret = std::env::var("SESSION_SECRET").map_err(|_| {
            SessionError::Configuration("SESSION_SECRET environment variable not set".to_string())
        })?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::Configuration(format!(
                "SESSION_SECRET must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TTL_SECONDS);

        Ok(Self {
            secret,
            ttl_seconds,
        })
    }
}

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// User ID
    pub sub: Uuid,
    /// Email the session was issued for
    pub email: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token id, used for revocation
    pub jti: Uuid,
}

/// A freshly issued session token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_in: u64,
}

/// Storage for revoked token ids
#[async_trait]
pub trait RevocationList: Send + Sync {
    /// Mark a token id as revoked for `ttl_seconds`
    async fn revoke(&self, jti: Uuid, ttl_seconds: u64) -> anyhow::Result<()>;

    /// Whether a token id has been revoked
    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool>;
}

fn revocation_key(jti: Uuid) -> String {
    format!("revoked_session:{}", jti)
}

#[async_trait]
impl RevocationList for RedisPool {
    async fn revoke(&self, jti: Uuid, ttl_seconds: u64) -> anyhow::Result<()> {
        // Redis rejects SETEX with a zero TTL
        self.set(&revocation_key(jti), "1", Some(ttl_seconds.max(1)))
            .await
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        Ok(self.get(&revocation_key(jti)).await?.is_some())
    }
}

/// Process-local revocation list for single-node setups and tests
#[derive(Default, Clone)]
pub struct InMemoryRevocations {
    entries: Arc<Mutex<HashMap<Uuid, u64>>>,
}

impl InMemoryRevocations {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationList for InMemoryRevocations {
    async fn revoke(&self, jti: Uuid, ttl_seconds: u64) -> anyhow::Result<()> {
        let expires = now_secs()? + ttl_seconds;
        let mut entries = self.entries.lock().await;
        entries.insert(jti, expires);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> anyhow::Result<bool> {
        let now = now_secs()?;
        let mut entries = self.entries.lock().await;
        entries.retain(|_, expires| *expires > now);
        Ok(entries.contains_key(&jti))
    }
}

fn now_secs() -> anyhow::Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

/// Issues, verifies and revokes session tokens
#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
    revocations: Arc<dyn RevocationList>,
}

impl SessionService {
    /// Initialize a new session service
    pub fn new(config: &SessionConfig, revocations: Arc<dyn RevocationList>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl_seconds: config.ttl_seconds,
            revocations,
        }
    }

    /// Issue a session token for a user
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<IssuedSession, SessionError> {
        let now = now_secs().map_err(SessionError::Store)?;

        let claims = SessionClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedSession {
            token,
            expires_in: self.ttl_seconds,
        })
    }

    /// Validate a token and return its claims
    pub async fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?.claims;

        let revoked = self
            .revocations
            .is_revoked(claims.jti)
            .await
            .map_err(SessionError::Store)?;

        if revoked {
            warn!("Rejected revoked session for user {}", claims.sub);
            return Err(SessionError::Revoked);
        }

        Ok(claims)
    }

    /// Revoke a session for the rest of its lifetime
    pub async fn revoke(&self, claims: &SessionClaims) -> Result<(), SessionError> {
        let now = now_secs().map_err(SessionError::Store)?;
        let remaining = claims.exp.saturating_sub(now);

        self.revocations
            .revoke(claims.jti, remaining)
            .await
            .map_err(SessionError::Store)
    }

    /// Lifetime of issued tokens in seconds
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }
}
