//! Audio transcoding.
//!
//! Given a resolved stream URL and a destination path, this stage drives
//! an external transcoder tool and classifies its exit outcome. The tool
//! is opaque; only its flags, exit code and output text are contracted.

mod error;
mod ffmpeg;

pub use error::ConvertError;
pub use ffmpeg::FfmpegTranscoder;

pub(crate) use ffmpeg::part_path;

use std::path::Path;

use async_trait::async_trait;

use crate::sink::LogSink;

/// Transcodes a media stream into a local audio file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcodes `stream_url` into `dest`, forwarding all tool output
    /// lines to `sink`. On success `dest` holds the complete audio file;
    /// a failed run never leaves a partial file at `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] when the tool cannot be launched, exits
    /// nonzero, or the destination cannot be finalized.
    async fn transcode(
        &self,
        stream_url: &str,
        dest: &Path,
        sink: &dyn LogSink,
    ) -> Result<(), ConvertError>;
}
