//! Durable conversion history backed by `SQLite`.
//!
//! The store's contract is deliberately narrow: insert one record per
//! conversion attempt at task start, update that same row in place when
//! the task reaches a terminal status, and read back the whole table in
//! recency order. Observers that want a live view subscribe to a revision
//! counter and re-query on change.
//!
//! # Example
//!
//! ```ignore
//! use mp3grab_core::{Database, HistoryStore, NewConversionRecord, TaskStatus};
//!
//! let db = Database::new_in_memory().await?;
//! let store = HistoryStore::new(db);
//!
//! let id = store.insert(&NewConversionRecord {
//!     url: "http://example.com/v1",
//!     timestamp_ms: 0,
//!     logs: "preparing conversion",
//! }).await?;
//!
//! // ... task runs ...
//! store.update_terminal(id, TaskStatus::Failed, None, None, "full log blob").await?;
//! ```

mod error;
mod record;

pub use error::{HistoryDbErrorKind, HistoryError};
pub use record::{ConversionRecord, NewConversionRecord};

use std::path::Path;
use std::sync::Arc;

use sqlx::Row;
use tokio::sync::watch;
use tracing::instrument;

use crate::db::Database;
use crate::task::TaskStatus;

/// Default number of records returned by [`HistoryStore::list_recent`].
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Returns `Ok(())` if at least one row was affected; otherwise [`HistoryError::RecordNotFound`].
fn check_affected(id: i64, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(HistoryError::RecordNotFound(id))
    } else {
        Ok(())
    }
}

/// History store for conversion records.
///
/// Cloneable handle over the shared connection pool plus a revision
/// counter bumped on every write, which observers use as a change signal.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    db: Database,
    revision: Arc<watch::Sender<u64>>,
}

impl HistoryStore {
    /// Creates a new history store over the given database connection.
    #[must_use]
    pub fn new(db: Database) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            db,
            revision: Arc::new(revision),
        }
    }

    /// Inserts the initial record for a starting task and returns its row id.
    ///
    /// The record is written with status running and no file path; the same
    /// row is later updated in place via [`update_terminal`].
    ///
    /// [`update_terminal`]: HistoryStore::update_terminal
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Database`] if the insert fails.
    #[instrument(skip(self, record), fields(url = %record.url))]
    pub async fn insert(&self, record: &NewConversionRecord<'_>) -> Result<i64> {
        let result = sqlx::query(
            r"INSERT INTO history (url, title, file_path, status, timestamp_ms, logs)
              VALUES (?, NULL, NULL, ?, ?, ?)
              RETURNING id",
        )
        .bind(record.url)
        .bind(TaskStatus::Running.as_str())
        .bind(record.timestamp_ms)
        .bind(record.logs)
        .fetch_one(self.db.pool())
        .await?;

        self.bump_revision();
        Ok(result.get("id"))
    }

    /// Updates an existing record in place with a terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::RecordNotFound`] if no record exists with the
    /// given id, or [`HistoryError::Database`] if the update fails.
    #[instrument(skip(self, logs), fields(id, status = %status))]
    pub async fn update_terminal(
        &self,
        id: i64,
        status: TaskStatus,
        file_path: Option<&Path>,
        title: Option<&str>,
        logs: &str,
    ) -> Result<()> {
        let file_path = file_path.and_then(Path::to_str);
        let result = sqlx::query(
            r"UPDATE history
              SET status = ?, file_path = ?, title = ?, logs = ?
              WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(file_path)
        .bind(title)
        .bind(logs)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        self.bump_revision();
        check_affected(id, result.rows_affected())
    }

    /// Returns the most recent conversion records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<ConversionRecord>> {
        let records = sqlx::query_as::<_, ConversionRecord>(
            r"SELECT * FROM history
              ORDER BY timestamp_ms DESC, id DESC
              LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(records)
    }

    /// Fetches one record by id, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<ConversionRecord>> {
        let record = sqlx::query_as::<_, ConversionRecord>("SELECT * FROM history WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(record)
    }

    /// Subscribes to the store's revision counter.
    ///
    /// The counter increments on every insert or update; a live view of the
    /// history re-runs [`list_recent`] whenever the value changes.
    ///
    /// [`list_recent`]: HistoryStore::list_recent
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Flips records left running by a crashed process to failed.
    ///
    /// Called once at startup, before any new task is started. Returns the
    /// number of reconciled records. In-flight conversions are not resumed
    /// across restarts, so a running record without a live process is
    /// always stale.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Database`] if the update fails.
    #[instrument(skip(self))]
    pub async fn reconcile_orphaned(&self) -> Result<u64> {
        let result = sqlx::query(
            r"UPDATE history
              SET status = ?, logs = logs || char(10) || 'conversion interrupted by shutdown'
              WHERE status = ?",
        )
        .bind(TaskStatus::Failed.as_str())
        .bind(TaskStatus::Running.as_str())
        .execute(self.db.pool())
        .await?;

        let reconciled = result.rows_affected();
        if reconciled > 0 {
            self.bump_revision();
        }
        Ok(reconciled)
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
