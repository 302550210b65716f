//! Log-line forwarding contract between pipeline stages and their task.
//!
//! The pipeline stages (extraction, transcoding) are the producers of
//! diagnostic output; the task that owns them is the single writer of the
//! observable log trail. A [`LogSink`] is how a stage hands lines back to
//! its owner without knowing anything about task state.

/// Receiver for diagnostic log lines emitted by a pipeline stage.
///
/// Implementations must tolerate being called from concurrent readers of a
/// child process's stdout and stderr streams.
pub trait LogSink: Send + Sync {
    /// Appends one log line to the owning task's log trail.
    fn append(&self, line: &str);
}

/// Closures can serve as sinks directly; used by tests and simple callers.
impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn append(&self, line: &str) {
        self(line);
    }
}

/// A sink that discards all lines. Useful when a caller only cares about
/// the stage outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn append(&self, _line: &str) {}
}
