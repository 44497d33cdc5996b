//! Chat session CRUD, scoped to the signed-in user.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{ChatSessionRecord, ChatStore, MessageRecord, SessionStore};
use crate::error::ServerError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::schemas::auth::SuccessResponse;
use crate::schemas::session::{
    AppendMessageRequest, CreateSessionRequest, MessageResponse, RenameSessionRequest, SessionResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_sessions, create_session, get_session, rename_session, delete_session, list_messages, append_message),
    components(schemas(
        CreateSessionRequest,
        RenameSessionRequest,
        SessionResponse,
        AppendMessageRequest,
        MessageResponse
    ))
)]
pub struct SessionApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat-sessions", get(list_sessions).post(create_session))
        .route("/chat-sessions/{id}", get(get_session).put(rename_session).delete(delete_session))
        .route("/chat-sessions/{id}/messages", get(list_messages).post(append_message))
}

fn not_found() -> ServerError {
    ServerError::NotFound("Chat session not found".into())
}

async fn owned_session(state: &AppState, id: &str, user_id: &str) -> Result<ChatSessionRecord, ServerError> {
    state.store.get_session(id, user_id).await?.ok_or_else(not_found)
}

#[utoipa::path(
    get,
    path = "/api/chat-sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Sessions, most recently updated first", body = Vec<SessionResponse>),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<SessionResponse>>, ServerError> {
    let sessions = state.store.list_sessions(&auth.user.id).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/chat-sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    req.validate()?;
    let now = Utc::now();
    let name = req
        .name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("Chat {}", now.to_rfc3339_opts(SecondsFormat::Millis, true)));
    let session = ChatSessionRecord {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id,
        name,
        created_at: now,
        last_updated: now,
    };
    state.store.create_session(session.clone()).await?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    get,
    path = "/api/chat-sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session", body = SessionResponse),
        (status = 404, description = "No such session for this user"),
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ServerError> {
    Ok(Json(owned_session(&state, &id, &auth.user.id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/api/chat-sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = RenameSessionRequest,
    responses(
        (status = 200, description = "Session renamed", body = SessionResponse),
        (status = 404, description = "No such session for this user"),
    )
)]
pub async fn rename_session(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RenameSessionRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    req.validate()?;
    let session = state
        .store
        .rename_session(&id, &auth.user.id, req.name.trim())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(session.into()))
}

#[utoipa::path(
    delete,
    path = "/api/chat-sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session and its messages deleted", body = SuccessResponse),
        (status = 404, description = "No such session for this user"),
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServerError> {
    if !state.store.delete_session(&id, &auth.user.id).await? {
        return Err(not_found());
    }
    Ok(Json(SuccessResponse { success: true }))
}

#[utoipa::path(
    get,
    path = "/api/chat-sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<MessageResponse>),
        (status = 404, description = "No such session for this user"),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    owned_session(&state, &id, &auth.user.id).await?;
    let messages = state.store.list_messages(&id).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/chat-sessions/{id}/messages",
    tag = "sessions",
    params(("id" = String, Path, description = "Session ID")),
    request_body = AppendMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = MessageResponse),
        (status = 404, description = "No such session for this user"),
    )
)]
pub async fn append_message(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AppendMessageRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    req.validate()?;
    owned_session(&state, &id, &auth.user.id).await?;
    let message = MessageRecord {
        id: Uuid::new_v4().to_string(),
        session_id: id,
        role: req.role,
        content: req.content,
        image_url: req.image_url,
        created_at: Utc::now(),
    };
    state.store.append_message(message.clone()).await?;
    state.store.touch_session(&message.session_id, message.created_at).await?;
    Ok(Json(message.into()))
}
