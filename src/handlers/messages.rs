//! Message handlers.
//!
//! # Endpoints
//!
//! - `POST /api/v1/sessions/{id}/messages` - append a message
//! - `GET /api/v1/sessions/{id}/messages?page=&size=` - page through a
//!   session's messages, oldest first (defaults page=0, size=20)
//!
//! Both operations require the session to exist and answer 404 otherwise.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, instrument};

use crate::error::{ApiError, AppResult};
use crate::models::{AddMessageRequest, MessagePageResponse, MessageResponse, PageParams};
use crate::state::AppState;
use crate::validation::{validate_add_message, validate_pagination};

/// Append a message to a session.
#[instrument(skip(state, payload))]
pub async fn add_message(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(payload): Json<AddMessageRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    verify_session_exists(&state, session_id).await?;
    let (sender, content, context) = validate_add_message(&payload)?;

    let message = state
        .store
        .messages
        .insert(session_id, sender, &content, context.as_deref())
        .await?;
    info!(message_id = message.id, session_id, "Message created");

    Ok((StatusCode::CREATED, Json(message.into())))
}

/// Page through a session's messages, oldest first.
#[instrument(skip(state))]
pub async fn get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<MessagePageResponse>> {
    verify_session_exists(&state, session_id).await?;
    validate_pagination(params.page, params.size)?;

    let page = state
        .store
        .messages
        .page_by_session(session_id, params.page, params.size)
        .await?;

    let total_pages = if page.total_elements == 0 {
        0
    } else {
        (page.total_elements + params.size - 1) / params.size
    };

    Ok(Json(MessagePageResponse {
        messages: page.messages.into_iter().map(MessageResponse::from).collect(),
        page: params.page,
        size: params.size,
        total_elements: page.total_elements,
        total_pages,
    }))
}

async fn verify_session_exists(state: &AppState, session_id: i64) -> AppResult<()> {
    if !state.store.sessions.exists(session_id).await? {
        return Err(ApiError::not_found("Session", session_id));
    }
    Ok(())
}
