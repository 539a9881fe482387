//! Domain entities for chat sessions and their messages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// A chat session owned by a user.
///
/// `(user_id, title)` pairs are unique; the storage layer enforces this with
/// the `uk_sessions_user_title` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single message within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub session_id: i64,
    pub sender: Sender,
    pub content: String,
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Who produced a message.
///
/// Stored lowercase in the database; the `chk_messages_sender` check
/// constraint admits exactly these three values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    System,
}

impl Sender {
    /// The database/wire representation of this sender.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
            Sender::System => "system",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    /// Parse case-insensitively; the stored form is always lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "assistant" => Ok(Sender::Assistant),
            "system" => Ok(Sender::System),
            other => Err(format!("unknown sender value: {other}")),
        }
    }
}
