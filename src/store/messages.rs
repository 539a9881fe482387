//! Message repository over SQLite.

use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use super::map_sqlx_error;
use super::sessions::parse_datetime;
use crate::error::{ApiError, AppResult, ConflictClassifier};
use crate::models::{Message, Sender};

/// One page of messages plus the total count for the session.
#[derive(Debug)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total_elements: i64,
}

/// SQLite-backed message repository.
#[derive(Clone)]
pub struct MessageStore {
    pool: SqlitePool,
    classifier: Arc<dyn ConflictClassifier>,
}

/// Internal row type for mapping SQLite rows to the domain message.
struct MessageRow {
    id: i64,
    session_id: i64,
    sender: String,
    content: String,
    context: Option<String>,
    timestamp: String,
}

impl MessageRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            sender: row.try_get("sender")?,
            content: row.try_get("content")?,
            context: row.try_get("context")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_message(self) -> AppResult<Message> {
        let sender = self
            .sender
            .parse::<Sender>()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt sender column: {e}")))?;
        Ok(Message {
            id: self.id,
            session_id: self.session_id,
            sender,
            content: self.content,
            context: self.context,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

impl MessageStore {
    pub fn new(pool: SqlitePool, classifier: Arc<dyn ConflictClassifier>) -> Self {
        Self { pool, classifier }
    }

    fn map_err(&self, err: sqlx::Error) -> ApiError {
        map_sqlx_error(err, self.classifier.as_ref())
    }

    /// Append a message to a session and return it.
    pub async fn insert(
        &self,
        session_id: i64,
        sender: Sender,
        content: &str,
        context: Option<&str>,
    ) -> AppResult<Message> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (session_id, sender, content, context, timestamp) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(sender.as_str())
        .bind(content)
        .bind(context)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        self.find_by_id(result.last_insert_rowid()).await
    }

    /// Fetch one message or fail with NotFound.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Message> {
        let row = sqlx::query(
            "SELECT id, session_id, sender, content, context, timestamp \
             FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?
        .ok_or_else(|| ApiError::not_found("Message", id))?;

        MessageRow::from_row(&row)
            .map_err(|e| self.map_err(e))?
            .into_message()
    }

    /// One page of a session's messages, oldest first.
    pub async fn page_by_session(
        &self,
        session_id: i64,
        page: i64,
        size: i64,
    ) -> AppResult<MessagePage> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;

        let rows = sqlx::query(
            "SELECT id, session_id, sender, content, context, timestamp \
             FROM messages WHERE session_id = ? \
             ORDER BY timestamp ASC, id ASC LIMIT ? OFFSET ?",
        )
        .bind(session_id)
        .bind(size)
        .bind(page * size)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        let messages = rows
            .iter()
            .map(|row| {
                MessageRow::from_row(row)
                    .map_err(|e| self.map_err(e))?
                    .into_message()
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(MessagePage {
            messages,
            total_elements: total.0,
        })
    }
}
