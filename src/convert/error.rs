//! Error types for the transcoding stage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while transcoding a stream into an audio file.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The transcoder exited with a nonzero return code.
    #[error("transcoder exited with code {return_code}")]
    ToolFailure {
        /// The tool's exit code (-1 when killed by a signal).
        return_code: i32,
        /// The tool's combined stdout/stderr output.
        output: String,
    },

    /// The transcoder could not be launched at all.
    #[error("failed to launch transcoder '{program}': {source}")]
    Spawn {
        /// The configured transcoder binary.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error preparing or finalizing the destination.
    #[error("IO error for {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
