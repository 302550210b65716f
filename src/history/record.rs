//! Conversion record types stored in the history table.

use sqlx::FromRow;

use crate::task::TaskStatus;

/// A durable conversion record, one row per conversion attempt.
///
/// A record is inserted with [`TaskStatus::Running`] the moment its task
/// starts and updated in place (same `id`) when the task reaches a
/// terminal status; it is never duplicated.
#[derive(Debug, Clone, FromRow)]
pub struct ConversionRecord {
    /// Row id assigned by the store at insert time.
    pub id: i64,
    /// The source page URL the task was started for.
    pub url: String,
    /// Resolved title, known only after extraction succeeds.
    pub title: Option<String>,
    /// Absolute path of the produced audio file; set only on success.
    pub file_path: Option<String>,
    /// Current status (stored as text, parsed via `status()`).
    #[sqlx(rename = "status")]
    pub status_str: String,
    /// Wall-clock task start time in Unix milliseconds.
    pub timestamp_ms: i64,
    /// The task's log trail flattened into one newline-joined blob.
    pub logs: String,
}

impl ConversionRecord {
    /// Returns the parsed status; unparseable values read as failed.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status_str
            .parse::<TaskStatus>()
            .unwrap_or(TaskStatus::Failed)
    }
}

/// Fields for a new conversion record at the initial persistence checkpoint.
#[derive(Debug, Clone)]
pub struct NewConversionRecord<'a> {
    /// The source page URL.
    pub url: &'a str,
    /// Wall-clock task start time in Unix milliseconds.
    pub timestamp_ms: i64,
    /// Initial log trail (usually a single preparation line).
    pub logs: &'a str,
}
