//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth_middleware,
    models::{CreateChatRequest, CurrentUser, RenameChatRequest, SendMessageRequest},
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/chats", get(list_chats).post(create_chat))
        .route("/chats/:id", patch(rename_chat).delete(delete_chat))
        .route("/chats/:id/messages", get(list_messages).post(send_message))
        .route("/me", get(get_profile))
        .route("/me/stats", get(get_stats))
        .route("/me/export", get(export_chats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Malformed ids are reported exactly like missing chats
fn parse_chat_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::chat_not_found())
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// List the caller's chats, most recent first
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let chats = state.conversations.list_chats(&user).await?;
    Ok(Json(chats))
}

/// Create a chat; the body is optional
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Option<Json<CreateChatRequest>>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload.unwrap_or_default();
    let chat = state
        .conversations
        .create_chat(&user, request.title.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(chat)))
}

pub async fn rename_chat(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<RenameChatRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let chat_id = parse_chat_id(&id)?;
    let request = json_body(payload)?;

    let chat = state
        .conversations
        .rename_chat(&user, chat_id, request.title.as_deref())
        .await?;

    Ok(Json(chat))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let chat_id = parse_chat_id(&id)?;
    state.conversations.delete_chat(&user, chat_id).await?;

    Ok(Json(json!({ "deleted": true })))
}

/// Full transcript, oldest first
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let chat_id = parse_chat_id(&id)?;
    let messages = state.conversations.list_messages(&user, chat_id).await?;

    Ok(Json(messages))
}

/// Send a message and wait for the assistant's reply
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let chat_id = parse_chat_id(&id)?;
    let request = json_body(payload)?;

    let exchange = state
        .conversations
        .send_message(&user, chat_id, request.content.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(exchange)))
}

/// Profile of the caller
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let profile = state
        .users
        .find_by_email(&user.email)
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(profile))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let stats = state.conversations.stats(&user).await?;
    Ok(Json(stats))
}

/// Every chat with its transcript, for data export
pub async fn export_chats(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let export = state.conversations.export(&user).await?;
    Ok(Json(json!({ "chats": export })))
}
