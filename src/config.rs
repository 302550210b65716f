//! Runtime settings shared by the pipeline stages.
//!
//! Settings are resolved once by the frontend (CLI flags over defaults)
//! and handed to the task registry, which passes the relevant pieces to
//! each stage.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default output directory for produced audio files.
pub const DEFAULT_OUTPUT_DIR: &str = "./converted";

/// Default resolver tool binary (queried for a single metadata document).
pub const DEFAULT_RESOLVER_BIN: &str = "yt-dlp";

/// Default transcoder tool binary.
pub const DEFAULT_TRANSCODER_BIN: &str = "ffmpeg";

/// Default MP3 VBR quality (`-q:a`); 0 is best, 9 is worst.
pub const DEFAULT_AUDIO_QUALITY: u8 = 2;

/// Default per-stage timeout in seconds. Stream resolution and transcoding
/// each get this budget; the external tools impose no timeout of their own.
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 600;

/// Resolved runtime configuration for the conversion pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory where produced `.mp3` files are written (created if absent).
    pub output_dir: PathBuf,
    /// Resolver tool binary name or path.
    pub resolver_bin: String,
    /// Transcoder tool binary name or path.
    pub transcoder_bin: String,
    /// MP3 VBR quality passed to the transcoder (0-9).
    pub audio_quality: u8,
    /// Wall-clock budget for each pipeline stage.
    pub stage_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            resolver_bin: DEFAULT_RESOLVER_BIN.to_string(),
            transcoder_bin: DEFAULT_TRANSCODER_BIN.to_string(),
            audio_quality: DEFAULT_AUDIO_QUALITY,
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Creates settings with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the resolver tool binary.
    #[must_use]
    pub fn with_resolver_bin(mut self, bin: impl Into<String>) -> Self {
        self.resolver_bin = bin.into();
        self
    }

    /// Sets the transcoder tool binary.
    #[must_use]
    pub fn with_transcoder_bin(mut self, bin: impl Into<String>) -> Self {
        self.transcoder_bin = bin.into();
        self
    }

    /// Sets the MP3 VBR quality (clamped to 0-9).
    #[must_use]
    pub fn with_audio_quality(mut self, quality: u8) -> Self {
        self.audio_quality = quality.min(9);
        self
    }

    /// Sets the per-stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }
}
