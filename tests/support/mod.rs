//! Shared helpers for integration tests: fake pipeline stages and fake
//! external tool scripts.

#![allow(dead_code)] // not every integration test uses every helper

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use mp3grab_core::{
    ConvertError, ExtractError, LogSink, ResolvedMedia, StreamResolver, Transcoder,
};

/// A scripted resolver stage with a fixed outcome and optional delay.
pub struct FakeResolver {
    stream_url: String,
    title: Option<String>,
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeResolver {
    /// Resolver that succeeds with the given title.
    pub fn succeeding(title: &str) -> Self {
        Self {
            stream_url: "http://cdn.example.com/stream.m3u8".to_string(),
            title: Some(title.to_string()),
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Resolver that succeeds without any title.
    pub fn untitled() -> Self {
        Self {
            title: None,
            ..Self::succeeding("")
        }
    }

    /// Resolver that always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding("unused")
        }
    }

    /// Adds an artificial delay before the outcome is produced.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times `resolve` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(&self, url: &str, sink: &dyn LogSink) -> Result<ResolvedMedia, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            sink.append("ERROR: unable to extract metadata");
            return Err(ExtractError::tool_failure(url, 1, "unable to extract"));
        }
        sink.append(&format!("resolved stream: {}", self.stream_url));
        Ok(ResolvedMedia {
            stream_url: self.stream_url.clone(),
            title: self.title.clone(),
        })
    }
}

/// A scripted transcoder stage.
///
/// On success it writes a small file at the destination, which is what the
/// real stage guarantees.
pub struct FakeTranscoder {
    fail: bool,
    panic: bool,
    part_then_stall: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    pub fn succeeding() -> Self {
        Self {
            fail: false,
            panic: false,
            part_then_stall: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::succeeding()
        }
    }

    /// Transcoder that panics mid-stage, to exercise fault containment.
    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::succeeding()
        }
    }

    /// Transcoder that writes its temp file and then stalls for `delay`,
    /// like a real tool mid-write when the stage deadline hits.
    pub fn stalling_with_part(delay: Duration) -> Self {
        Self {
            part_then_stall: true,
            delay,
            ..Self::succeeding()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        _stream_url: &str,
        dest: &Path,
        sink: &dyn LogSink,
    ) -> Result<(), ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.part_then_stall {
            let part = dest.with_file_name(format!(
                "{}.part",
                dest.file_name().and_then(|n| n.to_str()).unwrap_or("out")
            ));
            std::fs::write(&part, b"partial").map_err(|err| ConvertError::Io {
                path: part.clone(),
                source: err,
            })?;
            sink.append("writing output");
            tokio::time::sleep(self.delay).await;
        } else if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic {
            panic!("transcoder stage blew up");
        }
        if self.fail {
            sink.append("Conversion failed!");
            return Err(ConvertError::ToolFailure {
                return_code: 1,
                output: "Conversion failed!".to_string(),
            });
        }
        sink.append("size=  1024kB time=00:03:00.00 bitrate= 192.0kbits/s");
        std::fs::write(dest, b"ID3 fake audio payload").map_err(|err| ConvertError::Io {
            path: dest.to_path_buf(),
            source: err,
        })?;
        Ok(())
    }
}

/// Wraps a stage in an `Arc<dyn Trait>` for registry construction.
pub fn resolver(stage: FakeResolver) -> Arc<dyn StreamResolver> {
    Arc::new(stage)
}

pub fn transcoder(stage: FakeTranscoder) -> Arc<dyn Transcoder> {
    Arc::new(stage)
}

/// Writes an executable shell script at `path` (unix only).
#[cfg(unix)]
pub fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, body).expect("write fake tool script");
    let mut perms = std::fs::metadata(path)
        .expect("stat fake tool script")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("chmod fake tool script");
}
