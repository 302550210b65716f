//! Task status, observable snapshots, and the shared per-task state cell.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Status of a conversion task.
///
/// The only legal transitions are running → success and running → failed;
/// terminal states never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The pipeline is executing.
    Running,
    /// The audio file was produced and recorded.
    Success,
    /// The pipeline failed; the log trail explains why.
    Failed,
}

impl TaskStatus {
    /// Returns the database/string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Returns true for success or failed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid task status: {s}")),
        }
    }
}

/// An immutable copy of a task's observable state at a point in time.
///
/// Snapshots for one task form a totally ordered sequence: `logs` only
/// ever prefix-extends, `status` is monotonic, and `output_path` is
/// present iff `status` is success.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    /// The source page URL; also the task's registry key.
    pub url: String,
    /// Resolved title, known only after extraction.
    pub title: Option<String>,
    /// Current status.
    pub status: TaskStatus,
    /// Ordered, append-only log trail.
    pub logs: Vec<String>,
    /// Path of the produced audio file; set only on success.
    pub output_path: Option<PathBuf>,
    /// Wall-clock start time in Unix milliseconds.
    pub started_at_ms: i64,
    /// History store row id, assigned once the initial record is written.
    pub record_id: Option<i64>,
}

/// Shared mutable state for one task plus its snapshot subscribers.
///
/// The pipeline runner is the sole writer; observers only ever receive
/// snapshot clones. The inner mutex is never held across an await point.
pub(crate) struct TaskCell {
    inner: Mutex<TaskInner>,
}

struct TaskInner {
    snapshot: TaskSnapshot,
    subscribers: Vec<mpsc::UnboundedSender<TaskSnapshot>>,
}

impl TaskCell {
    /// Creates a fresh running task for `url` with its initial log line.
    pub(crate) fn new(url: String) -> Self {
        let initial_log = format!("preparing conversion: {url}");
        let snapshot = TaskSnapshot {
            url,
            title: None,
            status: TaskStatus::Running,
            logs: vec![initial_log],
            output_path: None,
            started_at_ms: now_ms(),
            record_id: None,
        };
        Self {
            inner: Mutex::new(TaskInner {
                snapshot,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a clone of the current snapshot.
    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        self.lock().snapshot.clone()
    }

    /// Returns the current status.
    pub(crate) fn status(&self) -> TaskStatus {
        self.lock().snapshot.status
    }

    /// Attaches a new subscriber.
    ///
    /// The subscriber immediately receives the current snapshot and then
    /// every subsequent snapshot in publication order. The channel closes
    /// after the terminal snapshot has been delivered.
    pub(crate) fn subscribe(&self) -> mpsc::UnboundedReceiver<TaskSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let _ = tx.send(inner.snapshot.clone());
        if !inner.snapshot.status.is_terminal() {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Appends one log line and publishes the new snapshot.
    ///
    /// Ignored on terminal tasks: the terminal snapshot is final.
    pub(crate) fn append_log(&self, line: impl Into<String>) {
        let mut inner = self.lock();
        if inner.snapshot.status.is_terminal() {
            debug!(url = %inner.snapshot.url, "log append after terminal status ignored");
            return;
        }
        inner.snapshot.logs.push(line.into());
        publish(&mut inner);
    }

    /// Records the history store row id; assigned exactly once.
    pub(crate) fn set_record_id(&self, id: i64) {
        let mut inner = self.lock();
        if inner.snapshot.record_id.is_some() {
            return;
        }
        inner.snapshot.record_id = Some(id);
        publish(&mut inner);
    }

    /// Returns the history store row id, if already assigned.
    pub(crate) fn record_id(&self) -> Option<i64> {
        self.lock().snapshot.record_id
    }

    /// Transitions to success with the final title, output path and a
    /// completion log line, then closes all subscriptions.
    pub(crate) fn finish_success(&self, title: String, output_path: PathBuf, line: String) {
        let mut inner = self.lock();
        if inner.snapshot.status.is_terminal() {
            return;
        }
        inner.snapshot.logs.push(line);
        inner.snapshot.status = TaskStatus::Success;
        inner.snapshot.title = Some(title);
        inner.snapshot.output_path = Some(output_path);
        publish(&mut inner);
        inner.subscribers.clear();
    }

    /// Transitions to failed with a diagnostic log line, then closes all
    /// subscriptions.
    pub(crate) fn finish_failed(&self, line: String) {
        let mut inner = self.lock();
        if inner.snapshot.status.is_terminal() {
            return;
        }
        inner.snapshot.logs.push(line);
        inner.snapshot.status = TaskStatus::Failed;
        publish(&mut inner);
        inner.subscribers.clear();
    }
}

/// Sends the current snapshot to every live subscriber, dropping closed ones.
fn publish(inner: &mut TaskInner) {
    let snapshot = inner.snapshot.clone();
    inner
        .subscribers
        .retain(|tx| tx.send(snapshot.clone()).is_ok());
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
