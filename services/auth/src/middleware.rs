//! Middleware for session token validation

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use common::session::SessionError;
use tracing::{error, warn};

use crate::{AppState, routes::AuthError};

/// Extract and validate the session token from the Authorization header
///
/// Inserts the verified `SessionClaims` into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AuthError::Unauthorized)?;

    let claims = state
        .sessions
        .verify(bearer.token())
        .await
        .map_err(|e| match e {
            SessionError::Store(e) => {
                error!("Failed to check session revocation: {}", e);
                AuthError::InternalServerError
            }
            other => {
                warn!("Rejected session token: {}", other);
                AuthError::Unauthorized
            }
        })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
