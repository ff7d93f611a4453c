//! Authentication middleware for session token validation

use axum::{extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use common::session::SessionError;
use tracing::warn;

use crate::{error::ApiError, models::CurrentUser, state::AppState};

/// Resolve the bearer token to a known user or reject the request
///
/// Inserts [`CurrentUser`] into the request extensions for the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthenticated)?;

    let claims = state
        .sessions
        .verify(bearer.token())
        .await
        .map_err(|e| match e {
            SessionError::Store(e) => ApiError::SessionStore(e.to_string()),
            other => {
                warn!("Rejected session token: {}", other);
                ApiError::Unauthenticated
            }
        })?;

    let user = state
        .users
        .find_by_email(&claims.email)
        .await?
        .ok_or_else(|| {
            warn!("Session for user {} has no matching account", claims.sub);
            ApiError::Unauthenticated
        })?;

    req.extensions_mut().insert(CurrentUser::from(&user));

    Ok(next.run(req).await)
}
