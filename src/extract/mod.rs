//! Stream URL and title resolution.
//!
//! Given a video-page URL, this stage produces a direct media stream URL
//! and a title by querying an external resolver tool for a structured
//! metadata document (no media is downloaded). The tool is opaque: only
//! its invocation flags and output document format are contracted.
//!
//! An earlier design resolved streams by passively intercepting in-page
//! network requests inside an embedded renderer; that strategy is
//! superseded by the tool query and intentionally not maintained here.
//! [`StreamResolver`] is the seam where an alternative strategy would
//! plug in.

mod error;
mod tool;

pub use error::ExtractError;
pub use tool::MetadataToolResolver;

use async_trait::async_trait;

use crate::sink::LogSink;

/// A successfully resolved media source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    /// Direct, playable stream URL.
    pub stream_url: String,
    /// Page title when the metadata document carries a usable one.
    pub title: Option<String>,
}

/// Resolves a page URL into a playable stream URL and title.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Resolves `url`, forwarding all diagnostic output to `sink` before
    /// returning, so the caller's log trail is complete even on failure.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the tool fails, produces no output,
    /// produces an unparseable document, or the document lacks a usable
    /// stream URL.
    async fn resolve(&self, url: &str, sink: &dyn LogSink) -> Result<ResolvedMedia, ExtractError>;
}
