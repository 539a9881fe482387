//! Session repository over SQLite.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use super::map_sqlx_error;
use crate::error::{ApiError, AppResult, ConflictClassifier};
use crate::models::Session;

/// SQLite-backed session repository.
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    classifier: Arc<dyn ConflictClassifier>,
}

/// Internal row type for mapping SQLite rows to the domain session.
struct SessionRow {
    id: i64,
    user_id: String,
    title: String,
    is_favorite: i64,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            is_favorite: row.try_get("is_favorite")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> AppResult<Session> {
        Ok(Session {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            is_favorite: self.is_favorite != 0,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

pub(crate) fn parse_datetime(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid stored timestamp {raw:?}: {e}")))
}

impl SessionStore {
    pub fn new(pool: SqlitePool, classifier: Arc<dyn ConflictClassifier>) -> Self {
        Self { pool, classifier }
    }

    fn map_err(&self, err: sqlx::Error) -> ApiError {
        map_sqlx_error(err, self.classifier.as_ref())
    }

    /// Insert a new session and return it.
    pub async fn insert(&self, user_id: &str, title: &str) -> AppResult<Session> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO sessions (user_id, title, is_favorite, created_at, updated_at) \
             VALUES (?, ?, 0, ?, ?)",
        )
        .bind(user_id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        self.find_by_id(result.last_insert_rowid()).await
    }

    /// Fetch one session or fail with NotFound.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Session> {
        let row = sqlx::query(
            "SELECT id, user_id, title, is_favorite, created_at, updated_at \
             FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?
        .ok_or_else(|| ApiError::not_found("Session", id))?;

        SessionRow::from_row(&row)
            .map_err(|e| self.map_err(e))?
            .into_session()
    }

    /// All sessions belonging to `user_id`, newest first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Session>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, is_favorite, created_at, updated_at \
             FROM sessions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        rows.iter()
            .map(|row| {
                SessionRow::from_row(row)
                    .map_err(|e| self.map_err(e))?
                    .into_session()
            })
            .collect()
    }

    /// Rename a session; bumps `updated_at`.
    pub async fn update_title(&self, id: i64, title: &str) -> AppResult<Session> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE sessions SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Session", id));
        }
        self.find_by_id(id).await
    }

    /// Mark or unmark a session as favorite; bumps `updated_at`.
    pub async fn set_favorite(&self, id: i64, is_favorite: bool) -> AppResult<Session> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE sessions SET is_favorite = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(is_favorite))
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Session", id));
        }
        self.find_by_id(id).await
    }

    /// Whether a session exists.
    pub async fn exists(&self, id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(row.is_some())
    }

    /// Delete a session (messages cascade). Fails with NotFound when absent.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Session", id));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::error::ApiError;
    use crate::store::tests::test_store;

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let (_dir, store) = test_store().await;

        let session = store.sessions.insert("alice", "New Chat").await.unwrap();
        assert_eq!(session.user_id, "alice");
        assert_eq!(session.title, "New Chat");
        assert!(!session.is_favorite);

        let fetched = store.sessions.find_by_id(session.id).await.unwrap();
        assert_eq!(fetched, session);
    }

    #[tokio::test]
    async fn test_find_by_user_newest_first() {
        let (_dir, store) = test_store().await;

        store.sessions.insert("bob", "first").await.unwrap();
        store.sessions.insert("bob", "second").await.unwrap();
        store.sessions.insert("carol", "other").await.unwrap();

        let sessions = store.sessions.find_by_user("bob").await.unwrap();
        assert_eq!(sessions.len(), 2);
        // Equal-timestamp rows fall back to id ordering, newest first.
        assert_eq!(sessions[0].title, "second");
        assert_eq!(sessions[1].title, "first");
    }

    #[tokio::test]
    async fn test_duplicate_title_conflicts() {
        let (_dir, store) = test_store().await;

        store.sessions.insert("alice", "Notes").await.unwrap();
        let err = store.sessions.insert("alice", "Notes").await.unwrap_err();

        match err {
            ApiError::Conflict(detail) => {
                assert!(detail.contains("same user ID and title"), "got: {detail}");
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        // Same title for a different user is fine.
        assert!(store.sessions.insert("bob", "Notes").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_title() {
        let (_dir, store) = test_store().await;

        let session = store.sessions.insert("alice", "Old").await.unwrap();
        let updated = store.sessions.update_title(session.id, "New").await.unwrap();

        assert_eq!(updated.title, "New");
        assert!(updated.updated_at >= session.updated_at);
    }

    #[tokio::test]
    async fn test_set_favorite() {
        let (_dir, store) = test_store().await;

        let session = store.sessions.insert("alice", "Chat").await.unwrap();
        let updated = store.sessions.set_favorite(session.id, true).await.unwrap();
        assert!(updated.is_favorite);

        let updated = store.sessions.set_favorite(session.id, false).await.unwrap();
        assert!(!updated.is_favorite);
    }

    #[tokio::test]
    async fn test_missing_session_is_not_found() {
        let (_dir, store) = test_store().await;

        for err in [
            store.sessions.find_by_id(999).await.unwrap_err(),
            store.sessions.update_title(999, "x").await.unwrap_err(),
            store.sessions.delete(999).await.unwrap_err(),
        ] {
            match err {
                ApiError::NotFound(msg) => {
                    assert_eq!(msg, "Session with id 999 not found");
                }
                other => panic!("expected not-found, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_delete_removes_session() {
        let (_dir, store) = test_store().await;

        let session = store.sessions.insert("alice", "Chat").await.unwrap();
        store.sessions.delete(session.id).await.unwrap();

        assert!(!store.sessions.exists(session.id).await.unwrap());
    }
}
