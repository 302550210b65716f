//! Transcoder tool invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{ConvertError, Transcoder};
use crate::config::Settings;
use crate::sink::LogSink;

/// Transcodes a stream into an `.mp3` file with an ffmpeg-style tool.
///
/// The tool is invoked to strip the video stream (`-vn`), encode with
/// `libmp3lame` at a fixed VBR quality, and overwrite its output (`-y`).
/// Output is written to a `.part` path next to the destination and renamed
/// into place only on a zero exit code, so a success outcome never
/// references a partially written file.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    quality: u8,
}

impl FfmpegTranscoder {
    /// Creates a transcoder invoking the binary configured in `settings`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            program: settings.transcoder_bin.clone(),
            quality: settings.audio_quality,
        }
    }

    /// Creates a transcoder invoking the given binary at the given quality.
    #[must_use]
    pub fn with_program(program: impl Into<String>, quality: u8) -> Self {
        Self {
            program: program.into(),
            quality: quality.min(9),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[instrument(skip(self, sink), fields(program = %self.program, dest = %dest.display()))]
    async fn transcode(
        &self,
        stream_url: &str,
        dest: &Path,
        sink: &dyn LogSink,
    ) -> Result<(), ConvertError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ConvertError::io(parent, err))?;
        }

        let part = part_path(dest);
        let mut child = Command::new(&self.program)
            .args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(stream_url)
            .args(["-vn", "-acodec", "libmp3lame", "-q:a"])
            .arg(self.quality.to_string())
            .args(["-f", "mp3"])
            .arg(&part)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A stage timeout drops this future mid-run; the tool must die
            // with it instead of writing the part file unsupervised.
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (mut combined, err_lines) =
            tokio::join!(forward_lines(stdout, sink), forward_lines(stderr, sink));
        combined.extend(err_lines);

        let status = child
            .wait()
            .await
            .map_err(|err| ConvertError::io(&part, err))?;

        if status.success() {
            debug!(part = %part.display(), "transcode finished, renaming into place");
            tokio::fs::rename(&part, dest)
                .await
                .map_err(|err| ConvertError::io(dest, err))?;
            Ok(())
        } else {
            // Never leave a stray partial file behind.
            let _ = tokio::fs::remove_file(&part).await;
            Err(ConvertError::ToolFailure {
                return_code: status.code().unwrap_or(-1),
                output: combined.join("\n"),
            })
        }
    }
}

/// Derives the temporary `.part` path for a destination file.
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map_or_else(
        || std::ffi::OsString::from("output.mp3"),
        std::ffi::OsStr::to_os_string,
    );
    name.push(".part");
    dest.with_file_name(name)
}

/// Streams lines from a child pipe into the sink, collecting them as well.
async fn forward_lines<R>(stream: Option<R>, sink: &dyn LogSink) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let Some(stream) = stream else {
        return collected;
    };
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            sink.append(&line);
        }
        collected.push(line);
    }
    collected
}
