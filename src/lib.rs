//! mp3grab core library
//!
//! This library turns shared video-page links into locally stored audio
//! files through a two-stage external-tool pipeline: a resolver tool turns
//! the page URL into a direct stream URL plus a title, and a transcoder
//! tool turns that stream into an `.mp3` file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`history`] - Durable conversion history (insert-then-update records)
//! - [`extract`] - Stream URL and title resolution via the resolver tool
//! - [`convert`] - Audio transcoding via the transcoder tool
//! - [`task`] - Concurrent task registry, state machine and pipeline runner
//! - [`config`] - Runtime settings shared by the pipeline stages
//! - [`sink`] - Log-line forwarding contract between stages and tasks

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod convert;
pub mod db;
pub mod extract;
pub mod history;
pub mod sink;
pub mod task;

mod filename;

// Re-export commonly used types
pub use config::Settings;
pub use convert::{ConvertError, FfmpegTranscoder, Transcoder};
pub use db::Database;
pub use extract::{ExtractError, MetadataToolResolver, ResolvedMedia, StreamResolver};
pub use history::{ConversionRecord, HistoryError, HistoryStore, NewConversionRecord};
pub use sink::LogSink;
pub use task::{TaskError, TaskRegistry, TaskSnapshot, TaskStatus};
