//! Authentication service routes

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use common::session::SessionClaims;
use oauth2::PkceCodeVerifier;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
    AppState,
    middleware::auth_middleware,
    models::{NewUser, User},
    oauth::OAuthSession,
    validation::validate_email,
};

/// Query parameters Google appends to the callback URL
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Response for a completed sign-in
#[derive(Serialize)]
pub struct SignInResponse {
    pub session_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: User,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/session", get(current_session))
        .route("/auth/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/google", get(google_sign_in))
        .route("/auth/google/callback", get(google_callback))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Start a Google sign-in by redirecting to the consent screen
pub async fn google_sign_in(State(state): State<AppState>) -> Result<Redirect, AuthError> {
    let (auth_url, csrf_token, pkce_verifier) = state.oauth.generate_auth_url();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| {
            error!("Failed to get current time: {}", e);
            AuthError::InternalServerError
        })?
        .as_secs();

    let pending = OAuthSession::new(
        csrf_token.secret().clone(),
        pkce_verifier.secret().clone(),
        state.oauth.provider(),
        now,
    );

    state.sessions.begin_sign_in(&pending).await.map_err(|e| {
        error!("Failed to store sign-in state: {}", e);
        AuthError::InternalServerError
    })?;

    Ok(Redirect::to(&auth_url))
}

/// Finish a Google sign-in and issue a session
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, AuthError> {
    if let Some(reason) = params.error {
        warn!("Google sign-in was not granted: {}", reason);
        return Err(AuthError::Unauthorized);
    }

    let (Some(code), Some(csrf)) = (params.code, params.state) else {
        return Err(AuthError::BadRequest(
            "Missing code or state parameter".to_string(),
        ));
    };

    let pending = state
        .sessions
        .complete_sign_in(&csrf)
        .await
        .map_err(|e| {
            error!("Failed to read sign-in state: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or_else(|| {
            warn!("Callback with unknown or expired sign-in state");
            AuthError::Unauthorized
        })?;

    let access_token = state
        .oauth
        .exchange_code(code, PkceCodeVerifier::new(pending.pkce_verifier))
        .await
        .map_err(|e| {
            warn!("Authorization code exchange failed: {:#}", e);
            AuthError::Unauthorized
        })?;

    let profile = state
        .oauth
        .fetch_profile(&access_token)
        .await
        .map_err(|e| {
            error!("Failed to fetch Google profile: {:#}", e);
            AuthError::BadGateway
        })?;

    let email = match profile.email {
        Some(email) if profile.verified_email && validate_email(&email).is_ok() => email,
        _ => {
            warn!("Rejected Google profile {} without a verified email", profile.id);
            return Err(AuthError::Unauthorized);
        }
    };

    let user = state
        .users
        .find_or_create(&NewUser {
            email,
            name: profile.name,
            image: profile.picture,
            provider_id: profile.id,
        })
        .await
        .map_err(|e| {
            error!("Failed to load or create user: {}", e);
            AuthError::InternalServerError
        })?;

    let session = state.sessions.create_session(&user).map_err(|e| {
        error!("Failed to issue session: {}", e);
        AuthError::InternalServerError
    })?;

    info!("User {} signed in", user.id);

    Ok(Json(SignInResponse {
        session_token: session.token,
        token_type: "Bearer".to_string(),
        expires_in: session.expires_in,
        user,
    }))
}

/// The user behind the presented session
pub async fn current_session(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load user: {}", e);
            AuthError::InternalServerError
        })?
        .ok_or(AuthError::Unauthorized)?;

    Ok(Json(user))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<impl IntoResponse, AuthError> {
    state.sessions.revoke(&claims).await.map_err(|e| {
        error!("Failed to revoke session: {}", e);
        AuthError::InternalServerError
    })?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("Identity provider unavailable")]
    BadGateway,

    #[error("Internal server error")]
    InternalServerError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::BadGateway => StatusCode::BAD_GATEWAY,
            AuthError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
