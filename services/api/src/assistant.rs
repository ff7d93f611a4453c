//! AI provider adapter
//!
//! The conversation orchestrator only sees [`AssistantModel`]: a stateless
//! function from (history, new input) to reply text that may fail. The
//! production implementation is [`gemini::GeminiClient`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Message, MessageRole};

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Errors raised by the AI provider
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Missing or unusable configuration
    #[error("Assistant configuration error: {0}")]
    Configuration(String),

    /// The request never produced an HTTP response
    #[error("Request to AI provider failed: {0}")]
    Transport(String),

    /// No reply within the configured bound
    #[error("AI provider did not answer within {0:?}")]
    Timeout(Duration),

    /// The provider answered with a non-success status
    #[error("AI provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider refused to answer
    #[error("AI provider blocked the request: {0}")]
    Blocked(String),

    /// The response could not be decoded
    #[error("Unreadable AI provider response: {0}")]
    Decode(String),

    /// The response carried no text
    #[error("AI provider returned an empty reply")]
    Empty,
}

/// Role of a history turn in the provider's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    User,
    Model,
}

impl ModelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelRole::User => "user",
            ModelRole::Model => "model",
        }
    }
}

impl From<MessageRole> for ModelRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => ModelRole::User,
            MessageRole::Assistant | MessageRole::System => ModelRole::Model,
        }
    }
}

/// One prior turn replayed to the provider
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTurn {
    pub role: ModelRole,
    pub text: String,
}

impl From<&Message> for HistoryTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            text: message.content.clone(),
        }
    }
}

/// A generative model seeded with the fixed system instruction
#[async_trait]
pub trait AssistantModel: Send + Sync {
    /// Generate a reply to `input` given the prior conversation
    async fn reply(&self, history: &[HistoryTurn], input: &str) -> Result<String, AssistantError>;
}

/// AI provider configuration
#[derive(Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Upper bound on one provider call
    pub timeout: Duration,
}

impl AssistantConfig {
    /// Create a new AssistantConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GOOGLE_API_KEY`: Generative Language API key (required)
    /// - `GEMINI_MODEL`: model name (default: "gemini-2.5-flash")
    /// - `GEMINI_BASE_URL`: API base URL (default: Google v1beta endpoint)
    /// - `ASSISTANT_TIMEOUT_SECONDS`: per-call timeout (default: 60)
    pub fn from_env() -> Result<Self, AssistantError> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AssistantError::Configuration("GOOGLE_API_KEY is not set".to_string())
            })?;

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_seconds = std::env::var("ASSISTANT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_seconds),
        })
    }
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
