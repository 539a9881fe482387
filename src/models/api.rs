//! Request and response DTOs for the session/message API.
//!
//! Wire names are camelCase (`userId`, `isFavorite`, `retryAfter`) to match
//! the published JSON contract. Request fields arrive as `Option`s so that
//! missing values reach the validators and surface as field errors rather
//! than opaque deserialization failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Message, Session};

/// Request to create a new chat session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Owner of the session (alphanumeric and underscores only).
    pub user_id: Option<String>,
    /// Optional title; blank or missing falls back to the default title.
    pub title: Option<String>,
}

/// Request to rename a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
}

/// Request to mark or unmark a session as favorite.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteRequest {
    pub is_favorite: Option<bool>,
}

/// Request to append a message to a session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMessageRequest {
    /// One of "user", "assistant", "system" (case-insensitive).
    pub sender: Option<String>,
    pub content: Option<String>,
    /// Optional retrieval context attached to the message.
    pub context: Option<String>,
}

/// Query parameters for listing sessions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSessionsParams {
    pub user_id: Option<String>,
}

/// Pagination query parameters for listing messages.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
}

fn default_page_size() -> i64 {
    20
}

/// A session as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            title: session.title,
            is_favorite: session.is_favorite,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// All sessions belonging to one user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub sessions: Vec<SessionResponse>,
    pub total: i64,
}

/// A message as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub session_id: i64,
    pub sender: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            session_id: message.session_id,
            sender: message.sender.as_str().to_string(),
            content: message.content,
            context: message.context,
            timestamp: message.timestamp,
        }
    }
}

/// One page of messages from a session, oldest first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePageResponse {
    pub messages: Vec<MessageResponse>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "UP" or "DOWN"
    pub status: String,
    /// Backing database engine
    pub database: String,
    /// Service version
    pub version: String,
    /// Current server time
    pub timestamp: DateTime<Utc>,
}
