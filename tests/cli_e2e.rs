//! End-to-end CLI tests for the mp3grab binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

mod support;

fn cmd_with_db(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mp3grab").expect("binary builds");
    cmd.arg("--db-path").arg(dir.path().join("history.db"));
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("mp3grab").expect("binary builds");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert shared video-page links"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("mp3grab").expect("binary builds");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mp3grab"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("mp3grab").expect("binary builds");
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that empty stdin input exits cleanly without starting anything.
#[test]
fn test_binary_empty_input_exits_zero() {
    let dir = TempDir::new().expect("temp dir");
    cmd_with_db(&dir).write_stdin("").assert().success();
}

/// Test that --history on a fresh database reports an empty history.
#[test]
fn test_binary_history_on_fresh_database() {
    let dir = TempDir::new().expect("temp dir");
    cmd_with_db(&dir)
        .arg("--history")
        .assert()
        .success()
        .stdout(predicate::str::contains("no conversions recorded"));
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use crate::support::write_script;

    struct FakeTools {
        dir: TempDir,
    }

    impl FakeTools {
        fn install() -> Self {
            let dir = TempDir::new().expect("tools dir");
            write_script(
                &dir.path().join("fake-yt-dlp"),
                "#!/bin/sh\n\
                 echo '{\"url\": \"http://cdn.example.com/s.m3u8\", \"title\": \"My Song\"}'\n",
            );
            write_script(
                &dir.path().join("fake-ffmpeg"),
                "#!/bin/sh\n\
                 for last; do :; done\n\
                 printf 'fake mp3 payload' > \"$last\"\n",
            );
            write_script(
                &dir.path().join("broken-yt-dlp"),
                "#!/bin/sh\n\
                 echo 'ERROR: video unavailable' >&2\n\
                 exit 1\n",
            );
            Self { dir }
        }

        fn bin(&self, name: &str) -> String {
            self.dir.path().join(name).display().to_string()
        }
    }

    /// Test a full conversion driven through the binary with fake tools.
    #[test]
    fn test_binary_converts_url_end_to_end() {
        let tools = FakeTools::install();
        let dir = TempDir::new().expect("temp dir");
        let out = dir.path().join("converted");

        cmd_with_db(&dir)
            .arg("--resolver-bin")
            .arg(tools.bin("fake-yt-dlp"))
            .arg("--ffmpeg-bin")
            .arg(tools.bin("fake-ffmpeg"))
            .arg("--output-dir")
            .arg(&out)
            .arg("http://example.com/watch?v=abc")
            .assert()
            .success();

        let produced = out.join("My_Song.mp3");
        assert!(produced.is_file(), "expected {}", produced.display());

        // The conversion shows up in history as a success.
        cmd_with_db(&dir)
            .arg("--history")
            .assert()
            .success()
            .stdout(predicate::str::contains("success"))
            .stdout(predicate::str::contains("My Song"));
    }

    /// Test that --json emits the final task state as a JSON line on
    /// stdout, with logs kept off it.
    #[test]
    fn test_binary_json_output_is_machine_readable() {
        let tools = FakeTools::install();
        let dir = TempDir::new().expect("temp dir");

        let assert = cmd_with_db(&dir)
            .arg("--json")
            .arg("--resolver-bin")
            .arg(tools.bin("fake-yt-dlp"))
            .arg("--ffmpeg-bin")
            .arg(tools.bin("fake-ffmpeg"))
            .arg("--output-dir")
            .arg(dir.path().join("converted"))
            .arg("http://example.com/watch?v=abc")
            .assert()
            .success();

        let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
        let line = stdout.lines().next().expect("one JSON line");
        let value: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
        assert_eq!(value["status"], "success");
        assert_eq!(value["url"], "http://example.com/watch?v=abc");
        assert_eq!(value["title"], "My Song");
        assert!(value["output_path"].as_str().is_some_and(|p| p.ends_with("My_Song.mp3")));
    }

    /// Test that a failing resolver makes the binary exit nonzero and
    /// leaves a failed history record.
    #[test]
    fn test_binary_reports_failed_conversion() {
        let tools = FakeTools::install();
        let dir = TempDir::new().expect("temp dir");

        cmd_with_db(&dir)
            .arg("--resolver-bin")
            .arg(tools.bin("broken-yt-dlp"))
            .arg("--ffmpeg-bin")
            .arg(tools.bin("fake-ffmpeg"))
            .arg("--output-dir")
            .arg(dir.path().join("converted"))
            .arg("http://example.com/watch?v=gone")
            .assert()
            .failure()
            .stderr(predicate::str::contains("conversions failed"));

        cmd_with_db(&dir)
            .arg("--history")
            .assert()
            .success()
            .stdout(predicate::str::contains("failed"));
    }
}
