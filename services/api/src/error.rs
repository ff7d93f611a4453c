//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::assistant::AssistantError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid session, or the session maps to no known user
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Missing or empty required input
    #[error("{0}")]
    Validation(String),

    /// Chat does not exist or is not owned by the caller
    #[error("{0}")]
    NotFound(String),

    /// The AI provider call failed, timed out or produced nothing usable
    #[error("Assistant unavailable: {0}")]
    Upstream(#[from] AssistantError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),

    /// Session revocation list could not be consulted
    #[error("Session store error: {0}")]
    SessionStore(String),
}

impl ApiError {
    /// Not-found error for a chat id, identical for missing and foreign chats
    pub fn chat_not_found() -> Self {
        ApiError::NotFound("Chat not found".to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Upstream(_) => "upstream_failure",
            ApiError::Database(_) | ApiError::SessionStore(_) => "storage_failure",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Upstream(e) => (
                StatusCode::BAD_GATEWAY,
                format!("The assistant could not answer: {}", e),
            ),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed".to_string(),
                )
            }
            ApiError::SessionStore(e) => {
                error!("Session store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
