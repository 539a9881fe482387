//! Session CRUD handlers.
//!
//! # Endpoints
//!
//! - `POST /api/v1/sessions` - create a session (blank title → "New Chat")
//! - `GET /api/v1/sessions?userId=` - list a user's sessions, newest first
//! - `GET /api/v1/sessions/{id}` - fetch one session
//! - `PATCH /api/v1/sessions/{id}` - rename
//! - `PATCH /api/v1/sessions/{id}/favorite` - toggle favorite flag
//! - `DELETE /api/v1/sessions/{id}` - delete (messages cascade)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, instrument};

use crate::error::{ApiError, AppResult};
use crate::models::{
    CreateSessionRequest, ListSessionsParams, SessionListResponse, SessionResponse,
    ToggleFavoriteRequest, UpdateSessionRequest,
};
use crate::state::AppState;
use crate::validation::{validate_create_session, validate_title, validate_user_id};

/// Create a new chat session for a user.
#[instrument(skip(state, payload))]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let (user_id, title) = validate_create_session(&payload)?;

    let session = state.store.sessions.insert(&user_id, &title).await?;
    info!(session_id = session.id, user_id = %session.user_id, "Session created");

    Ok((StatusCode::CREATED, Json(session.into())))
}

/// List all sessions for the given user, newest first.
#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<ListSessionsParams>,
) -> AppResult<Json<SessionListResponse>> {
    let user_id = validate_user_id(params.user_id.as_deref())?;

    let sessions = state.store.sessions.find_by_user(user_id).await?;
    let total = sessions.len() as i64;

    Ok(Json(SessionListResponse {
        sessions: sessions.into_iter().map(SessionResponse::from).collect(),
        total,
    }))
}

/// Fetch a single session by id.
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.store.sessions.find_by_id(session_id).await?;
    Ok(Json(session.into()))
}

/// Rename a session.
#[instrument(skip(state, payload))]
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(payload): Json<UpdateSessionRequest>,
) -> AppResult<Json<SessionResponse>> {
    // Existence first, so a bad title on a missing session still reads 404.
    state.store.sessions.find_by_id(session_id).await?;
    let title = validate_title(payload.title.as_deref())?;

    let session = state.store.sessions.update_title(session_id, title).await?;
    info!(session_id, "Session title updated");

    Ok(Json(session.into()))
}

/// Mark or unmark a session as favorite.
#[instrument(skip(state, payload))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(payload): Json<ToggleFavoriteRequest>,
) -> AppResult<Json<SessionResponse>> {
    state.store.sessions.find_by_id(session_id).await?;
    let is_favorite = payload
        .is_favorite
        .ok_or_else(|| ApiError::Validation("isFavorite is required".to_string()))?;

    let session = state
        .store
        .sessions
        .set_favorite(session_id, is_favorite)
        .await?;
    info!(session_id, is_favorite, "Session favorite toggled");

    Ok(Json(session.into()))
}

/// Delete a session and all its messages.
#[instrument(skip(state))]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.store.sessions.delete(session_id).await?;
    info!(session_id, "Session deleted");

    Ok(StatusCode::NO_CONTENT)
}
