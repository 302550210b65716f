//! Title sanitization and output path reservation.
//!
//! Output filenames are derived from resolved titles, which are arbitrary
//! text. This module turns them into filesystem-safe stems and reserves a
//! unique `.mp3` path in the shared output directory. Reservation is
//! atomic (`create_new`) because two tasks resolving the same title can
//! race on the same destination.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Maximum length (in characters) of a title-derived filename stem.
const MAX_STEM_CHARS: usize = 80;

/// Sanitizes a resolved title into a filesystem-safe filename stem.
///
/// Invalid and separator characters collapse into single underscores and
/// leading/trailing underscores are trimmed. Returns an empty string when
/// nothing usable remains; callers fall back to [`fallback_stem`].
pub(crate) fn sanitize_title(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars().take(MAX_STEM_CHARS) {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_matches('_').trim_matches('.').to_string()
}

/// Builds a timestamped fallback stem for tasks whose title is unusable.
pub(crate) fn fallback_stem(started_at_ms: i64) -> String {
    format!("audio_{}", started_at_ms / 1000)
}

/// Reserves a unique `.mp3` path under `dir` for the given stem.
///
/// Creates an empty placeholder file with `create_new` so that concurrent
/// tasks resolving identical titles claim distinct paths; on collision the
/// stem is suffixed `_1`, `_2`, ... The caller owns the placeholder: the
/// transcoder renames its finished output over it, and failure paths must
/// remove it.
pub(crate) fn reserve_output_path(dir: &Path, stem: &str) -> std::io::Result<PathBuf> {
    let mut candidate = dir.join(format!("{stem}.mp3"));
    let mut suffix: usize = 1;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                candidate = dir.join(format!("{stem}_{suffix}.mp3"));
                suffix += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title_replaces_invalid_characters() {
        assert_eq!(sanitize_title("My Song"), "My_Song");
        assert_eq!(sanitize_title("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_sanitize_title_collapses_separator_runs() {
        assert_eq!(sanitize_title("My   Song // Live"), "My_Song_Live");
    }

    #[test]
    fn test_sanitize_title_trims_edges() {
        assert_eq!(sanitize_title("  ??My Song??  "), "My_Song");
    }

    #[test]
    fn test_sanitize_title_empty_or_symbol_only_yields_empty() {
        assert_eq!(sanitize_title(""), "");
        assert_eq!(sanitize_title("???///"), "");
    }

    #[test]
    fn test_sanitize_title_truncates_long_titles() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_STEM_CHARS);
    }

    #[test]
    fn test_sanitize_title_keeps_unicode_alphanumerics() {
        assert_eq!(sanitize_title("青花瓷 周杰伦"), "青花瓷_周杰伦");
    }

    #[test]
    fn test_fallback_stem_uses_seconds() {
        assert_eq!(fallback_stem(1_700_000_123_456), "audio_1700000123");
    }

    #[test]
    fn test_reserve_output_path_creates_placeholder() {
        let tmp = tempfile::tempdir().unwrap();
        let path = reserve_output_path(tmp.path(), "My_Song").unwrap();
        assert_eq!(path, tmp.path().join("My_Song.mp3"));
        assert!(path.exists(), "placeholder should be created");
    }

    #[test]
    fn test_reserve_output_path_suffixes_on_collision() {
        let tmp = tempfile::tempdir().unwrap();
        let first = reserve_output_path(tmp.path(), "My_Song").unwrap();
        let second = reserve_output_path(tmp.path(), "My_Song").unwrap();
        let third = reserve_output_path(tmp.path(), "My_Song").unwrap();

        assert_eq!(first, tmp.path().join("My_Song.mp3"));
        assert_eq!(second, tmp.path().join("My_Song_1.mp3"));
        assert_eq!(third, tmp.path().join("My_Song_2.mp3"));
    }

    #[test]
    fn test_reserve_output_path_missing_dir_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let result = reserve_output_path(&missing, "My_Song");
        assert!(result.is_err(), "reservation in missing dir should fail");
    }
}
