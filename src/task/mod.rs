//! Conversion task orchestration.
//!
//! The [`TaskRegistry`] is the single entry point for starting, observing
//! and clearing tasks. Each task runs a two-stage pipeline (resolve the
//! audio stream, then transcode it) on its own tokio task and publishes
//! ordered state snapshots to any number of subscribers.

mod error;
mod registry;
mod runner;
mod state;

pub use error::TaskError;
pub use registry::TaskRegistry;
pub use state::{TaskSnapshot, TaskStatus};
