//! Request handlers for the JSON API and the chat page.

use super::{ApiError, AppState};
use crate::orchestrator::LoadOutcome;
use crate::rag::RagResponse;
use crate::session::{ChatHistory, Session, SessionSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

const PAGE: &str = include_str!("page.html");

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// === Request/Response Types ===

#[derive(Serialize)]
pub(super) struct CreatedSession {
    session_id: Uuid,
}

#[derive(Deserialize)]
pub(super) struct ApiKeyRequest {
    api_key: String,
}

#[derive(Deserialize)]
pub(super) struct LoadVideoRequest {
    url: String,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    message: String,
    #[serde(default)]
    api_key: Option<String>,
}

// === Handlers ===

pub(super) async fn index() -> Html<&'static str> {
    Html(PAGE)
}

pub(super) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub(super) async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(CreatedSession { session_id }))
}

pub(super) async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let handle = state.sessions.get_str(&id)?;
    let session = handle.lock().await;
    Ok(Json(session.snapshot()))
}

pub(super) async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let handle = state.sessions.get_str(&id)?;
    let session_id = handle.lock().await.id();
    state.sessions.end(&session_id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn set_api_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ApiKeyRequest>,
) -> ApiResult<SessionSnapshot> {
    let handle = state.sessions.get_str(&id)?;
    let mut session = handle.lock().await;
    session.set_api_key(&req.api_key)?;
    session.touch();
    Ok(Json(session.snapshot()))
}

pub(super) async fn load_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<LoadVideoRequest>,
) -> ApiResult<LoadOutcome> {
    let handle = state.sessions.get_str(&id)?;
    let mut session = handle.lock().await;
    apply_key(&mut session, req.api_key.as_deref())?;
    let outcome = state.orchestrator.load_video(&mut session, &req.url).await?;
    Ok(Json(outcome))
}

pub(super) async fn chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<RagResponse> {
    let handle = state.sessions.get_str(&id)?;
    let mut session = handle.lock().await;
    apply_key(&mut session, req.api_key.as_deref())?;
    let response = state.orchestrator.chat(&mut session, &req.message).await?;
    Ok(Json(response))
}

pub(super) async fn messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ChatHistory> {
    let handle = state.sessions.get_str(&id)?;
    let session = handle.lock().await;
    Ok(Json(session.history().clone()))
}

/// The page sends the key along with each action; an absent or blank key
/// keeps whatever the session already has.
fn apply_key(session: &mut Session, api_key: Option<&str>) -> Result<(), ApiError> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(session.set_api_key(key)?),
        _ => Ok(()),
    }
}
