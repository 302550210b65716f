//! Resolver tool invocation and metadata document parsing.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument};
use url::Url;

use super::{ExtractError, ResolvedMedia, StreamResolver};
use crate::config::Settings;
use crate::sink::LogSink;

/// Flags asking the resolver tool for a single structured metadata
/// document on stdout, without downloading any media.
const RESOLVER_FLAGS: [&str; 3] = ["--no-download", "--dump-json", "--no-warnings"];

/// Resolves stream URLs by querying an external metadata tool (yt-dlp by
/// default) for a single JSON document describing the page.
///
/// The tool's stderr diagnostics are forwarded to the log sink before any
/// error is returned, so the caller's log trail is complete on failure.
#[derive(Debug, Clone)]
pub struct MetadataToolResolver {
    program: String,
}

impl MetadataToolResolver {
    /// Creates a resolver invoking the binary configured in `settings`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            program: settings.resolver_bin.clone(),
        }
    }

    /// Creates a resolver invoking the given binary.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl StreamResolver for MetadataToolResolver {
    #[instrument(skip(self, sink), fields(program = %self.program, url = %url))]
    async fn resolve(
        &self,
        url: &str,
        sink: &dyn LogSink,
    ) -> Result<ResolvedMedia, ExtractError> {
        sink.append(&format!("querying resolver for {url}"));

        // The caller may drop this future on a stage timeout; the tool
        // must not keep running unsupervised past that point.
        let output = Command::new(&self.program)
            .args(RESOLVER_FLAGS)
            .arg(url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|line| !line.trim().is_empty()) {
            sink.append(line);
        }

        if !output.status.success() {
            let return_code = output.status.code().unwrap_or(-1);
            sink.append(&format!("resolver exited with code {return_code}"));
            return Err(ExtractError::tool_failure(
                url,
                return_code,
                stderr.trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let document = stdout.trim();
        if document.is_empty() {
            sink.append("resolver produced no metadata document");
            return Err(ExtractError::NoOutput {
                url: url.to_string(),
            });
        }

        let media = parse_metadata_document(url, document).inspect_err(|err| {
            sink.append(&format!("could not use resolver output: {err}"));
        })?;

        debug!(stream_url = %media.stream_url, title = ?media.title, "resolved media");
        sink.append(&format!("resolved stream: {}", media.stream_url));
        Ok(media)
    }
}

/// Parses the resolver's metadata document for `url` and `title` fields.
fn parse_metadata_document(url: &str, document: &str) -> Result<ResolvedMedia, ExtractError> {
    let value: Value = serde_json::from_str(document).map_err(|err| ExtractError::Parse {
        url: url.to_string(),
        detail: err.to_string(),
    })?;

    let stream_url = value
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty() && Url::parse(candidate).is_ok())
        .ok_or_else(|| ExtractError::MissingStreamUrl {
            url: url.to_string(),
        })?
        .to_string();

    let title = value
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(ToString::to_string);

    Ok(ResolvedMedia { stream_url, title })
}
