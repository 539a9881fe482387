//! SQLite persistence layer.
//!
//! The pool runs in WAL mode with foreign keys enforced and migrations
//! applied at connect time. Repositories own raw sqlx queries; every
//! `sqlx::Error` is translated into the application taxonomy here, at the
//! only boundary that knows which engine is underneath:
//!
//! - `RowNotFound` → `ApiError::NotFound`
//! - constraint violations → `ApiError::Conflict` with a detail produced by
//!   the configured [`ConflictClassifier`]
//! - anything else → `ApiError::Internal` (logged, masked from callers)

mod messages;
mod sessions;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::{ApiError, ConflictClassifier, SqliteConflictClassifier};

pub use messages::{MessagePage, MessageStore};
pub use sessions::SessionStore;

/// Open a SQLite pool and run migrations.
///
/// WAL journal mode, enforced foreign keys, and a 5-second busy timeout;
/// the database file is created on first use.
pub async fn connect(database_url: &str) -> Result<SqlitePool, anyhow::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Shared handle to both repositories.
///
/// Cloning is cheap; the pool and classifier are reference-counted. The
/// classifier is injected so a different storage engine can swap in its own
/// conflict-detail mapping without touching the taxonomy.
#[derive(Clone)]
pub struct Store {
    pub sessions: SessionStore,
    pub messages: MessageStore,
    pool: SqlitePool,
}

impl Store {
    /// Build a store over `pool` with the SQLite conflict classifier.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_classifier(pool, Arc::new(SqliteConflictClassifier))
    }

    /// Build a store with a custom conflict classifier.
    pub fn with_classifier(pool: SqlitePool, classifier: Arc<dyn ConflictClassifier>) -> Self {
        Self {
            sessions: SessionStore::new(pool.clone(), classifier.clone()),
            messages: MessageStore::new(pool.clone(), classifier),
            pool,
        }
    }

    /// Cheap connectivity probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Translate a sqlx failure into the application taxonomy.
pub(crate) fn map_sqlx_error(err: sqlx::Error, classifier: &dyn ConflictClassifier) -> ApiError {
    match err {
        sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
        sqlx::Error::Database(db_err) => {
            use sqlx::error::ErrorKind;
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::CheckViolation
                | ErrorKind::NotNullViolation => {
                    ApiError::Conflict(classifier.classify(db_err.message()))
                }
                _ => ApiError::Internal(anyhow::Error::new(db_err)),
            }
        }
        other => ApiError::Internal(anyhow::Error::new(other)),
    }
}
