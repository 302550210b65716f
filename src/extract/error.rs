//! Error types for the extraction stage.

use thiserror::Error;

/// Errors that can occur while resolving a page URL into a stream URL.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The resolver tool exited successfully but produced no output.
    #[error("resolver produced no output for {url}")]
    NoOutput {
        /// The page URL being resolved.
        url: String,
    },

    /// The resolver output was not a parseable metadata document.
    #[error("failed to parse resolver output for {url}: {detail}")]
    Parse {
        /// The page URL being resolved.
        url: String,
        /// Parser diagnostic.
        detail: String,
    },

    /// The metadata document lacks a usable stream URL.
    #[error("resolver output for {url} lacks a usable stream URL")]
    MissingStreamUrl {
        /// The page URL being resolved.
        url: String,
    },

    /// The resolver tool exited with a nonzero return code.
    #[error("resolver exited with code {return_code} for {url}")]
    ToolFailure {
        /// The page URL being resolved.
        url: String,
        /// The tool's exit code (-1 when killed by a signal).
        return_code: i32,
        /// The tool's diagnostic output.
        detail: String,
    },

    /// The resolver tool could not be launched at all.
    #[error("failed to launch resolver '{program}': {source}")]
    Spawn {
        /// The configured resolver binary.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Creates a tool-failure error from an exit code and diagnostic text.
    #[must_use]
    pub fn tool_failure(url: impl Into<String>, return_code: i32, detail: impl Into<String>) -> Self {
        Self::ToolFailure {
            url: url.into(),
            return_code,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_no_output_display() {
        let err = ExtractError::NoOutput {
            url: "http://example.com/v1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no output"), "unexpected message: {msg}");
        assert!(msg.contains("http://example.com/v1"));
    }

    #[test]
    fn test_extract_error_tool_failure_display() {
        let err = ExtractError::tool_failure("http://example.com/v1", 2, "geo-blocked");
        let msg = err.to_string();
        assert!(msg.contains("code 2"), "unexpected message: {msg}");
        assert!(msg.contains("http://example.com/v1"));
    }

    #[test]
    fn test_extract_error_missing_stream_url_display() {
        let err = ExtractError::MissingStreamUrl {
            url: "http://example.com/v1".to_string(),
        };
        assert!(err.to_string().contains("lacks a usable stream URL"));
    }
}
