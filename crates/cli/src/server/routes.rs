//! Route handlers.

use super::auth::AuthenticatedUser;
use super::error::ApiError;
use super::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use notewise_core::AppError;
use notewise_knowledge::SourceRef;
use serde::{Deserialize, Serialize};

const SERVICE_NAME: &str = "notewise-api";

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}

#[derive(Serialize)]
pub struct SessionResponse {
    session_id: String,
}

#[tracing::instrument(name = "create_session", skip_all, fields(user = %user.user_id))]
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<SessionResponse>, ApiError> {
    let session_id = state.sessions()?.create_session(&user.user_id);
    Ok(Json(SessionResponse { session_id }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    message: String,
    /// Omitted: a new session is started and its id returned
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponse {
    session_id: String,
    response: String,
    sources: Vec<SourceRef>,
}

#[tracing::instrument(name = "chat", skip_all, fields(user = %user.user_id))]
pub async fn chat(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| AppError::BadRequest(format!("invalid request body: {}", e.body_text())))?;

    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("message must not be empty".to_string()).into());
    }

    let sessions = state.sessions()?;
    let session_id = match request.session_id {
        Some(id) => id,
        None => sessions.create_session(&user.user_id),
    };

    let answer = sessions
        .chat(&session_id, &user.user_id, &request.message, &state.call_context())
        .await?;

    tracing::debug!(session = %session_id, sources = answer.sources.len(), "Answered");

    Ok(Json(ChatResponse {
        session_id,
        response: answer.response,
        sources: answer.sources,
    }))
}
