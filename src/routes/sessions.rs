//! Session management endpoints
//!
//! Thin CRUD surface over the session store: list, create, inspect, update
//! and delete sessions, plus message listing and manual appends. No
//! invariants live here beyond "the store must be reachable".

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::ChatMessage,
    error::{AppError, AppResult},
    session::SessionRecord,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub model_id: Option<String>,
}

fn default_title() -> String {
    "New Chat".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionBody {
    pub title: Option<String>,
    pub model_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetSessionQuery {
    #[serde(default)]
    pub include_messages: bool,
    pub message_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionRecord>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: String,
}

/// Fail fast when the store is unreachable
async fn require_store(state: &AppState) -> AppResult<()> {
    if state.session_store.is_available().await {
        Ok(())
    } else {
        Err(AppError::SessionUnavailable)
    }
}

/// List chat sessions, most recently updated first
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSessionsQuery>,
) -> AppResult<Json<SessionsResponse>> {
    require_store(&state).await?;

    let limit = query.limit.clamp(1, 100);
    let sessions = state.session_store.list_sessions(limit, query.offset).await?;
    Ok(Json(SessionsResponse { sessions }))
}

/// Create a new chat session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionBody>,
) -> AppResult<Json<SessionResponse>> {
    require_store(&state).await?;

    let session = state
        .session_store
        .create_session(None, &body.title, body.model_id.as_deref().unwrap_or(""))
        .await?;

    Ok(Json(SessionResponse {
        session,
        messages: None,
    }))
}

/// Get a chat session by id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<GetSessionQuery>,
) -> AppResult<Json<SessionResponse>> {
    require_store(&state).await?;

    let session = state
        .session_store
        .get_session(&session_id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    let messages = if query.include_messages {
        Some(
            state
                .session_store
                .list_messages(&session_id, query.message_limit)
                .await?,
        )
    } else {
        None
    };

    Ok(Json(SessionResponse { session, messages }))
}

/// Update a chat session's title or model
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<UpdateSessionBody>,
) -> AppResult<Json<SessionResponse>> {
    require_store(&state).await?;

    state
        .session_store
        .update_metadata(&session_id, body.title.as_deref(), body.model_id.as_deref())
        .await?;

    let session = state
        .session_store
        .get_session(&session_id)
        .await?
        .ok_or_else(|| AppError::SessionNotFound(session_id.clone()))?;

    Ok(Json(SessionResponse {
        session,
        messages: None,
    }))
}

/// Delete a chat session and its messages
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    require_store(&state).await?;

    state.session_store.delete_session(&session_id).await?;

    Ok(Json(StatusResponse {
        message: format!("Session {session_id} deleted successfully"),
    }))
}

/// List messages for a chat session
pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<Json<MessagesResponse>> {
    require_store(&state).await?;

    let messages = state
        .session_store
        .list_messages(&session_id, query.limit)
        .await?;

    Ok(Json(MessagesResponse { messages }))
}

/// Append a message to a chat session
pub async fn add_session_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(message): Json<ChatMessage>,
) -> AppResult<Json<StatusResponse>> {
    require_store(&state).await?;

    state
        .session_store
        .append_message(&session_id, &message)
        .await?;

    Ok(Json(StatusResponse {
        message: "Message added successfully".to_string(),
    }))
}

/// Clear all messages for a chat session
pub async fn clear_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    require_store(&state).await?;

    state.session_store.clear_messages(&session_id).await?;

    Ok(Json(StatusResponse {
        message: format!("Messages for session {session_id} cleared successfully"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query: ListSessionsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_create_body_defaults() {
        let body: CreateSessionBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.title, "New Chat");
        assert!(body.model_id.is_none());
    }
}
