//! Error types for task registry operations.

use thiserror::Error;

/// Errors raised by the task registry for contract violations.
///
/// Pipeline failures never surface here; they collapse the affected task
/// to a failed status with a diagnostic log trail instead.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// No task was ever started for this URL, or it has been cleared.
    #[error("no task found for URL: {0}")]
    NotFound(String),

    /// The task is still running; clearing it would orphan a live pipeline.
    #[error("task is still running and cannot be cleared: {0}")]
    StillRunning(String),

    /// A blank URL cannot identify a task.
    #[error("conversion URL must not be blank")]
    BlankUrl,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_not_found_message() {
        let err = TaskError::NotFound("http://example.com/v1".to_string());
        let msg = err.to_string();
        assert!(msg.contains("no task found"));
        assert!(msg.contains("http://example.com/v1"));
    }

    #[test]
    fn test_task_error_still_running_message() {
        let err = TaskError::StillRunning("http://example.com/v1".to_string());
        assert!(err.to_string().contains("still running"));
    }

    #[test]
    fn test_task_error_blank_url_message() {
        assert!(TaskError::BlankUrl.to_string().contains("blank"));
    }
}
