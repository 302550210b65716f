//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use mp3grab_core::config::{
    DEFAULT_AUDIO_QUALITY, DEFAULT_OUTPUT_DIR, DEFAULT_RESOLVER_BIN, DEFAULT_STAGE_TIMEOUT_SECS,
    DEFAULT_TRANSCODER_BIN,
};

/// Default path of the conversion history database file.
pub const DEFAULT_DB_PATH: &str = "mp3grab.db";

/// Convert shared video-page links into local MP3 files.
///
/// Each URL is resolved to a direct audio stream, transcoded to MP3, and
/// recorded in a durable conversion history.
#[derive(Parser, Debug)]
#[command(name = "mp3grab")]
#[command(author, version, about)]
pub struct Args {
    /// Video page URLs to convert (read from stdin when omitted)
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory where produced MP3 files are written
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Path of the conversion history database
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Resolver tool binary used to extract the stream URL and title
    #[arg(long, default_value = DEFAULT_RESOLVER_BIN)]
    pub resolver_bin: String,

    /// Transcoder tool binary used to produce the MP3 file
    #[arg(long, default_value = DEFAULT_TRANSCODER_BIN)]
    pub ffmpeg_bin: String,

    /// MP3 VBR quality, 0 (best) to 9 (worst)
    #[arg(long, default_value_t = DEFAULT_AUDIO_QUALITY, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub quality: u8,

    /// Per-stage timeout in seconds (1-86400)
    #[arg(long, default_value_t = DEFAULT_STAGE_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pub stage_timeout: u64,

    /// Print recent conversion history and exit
    #[arg(long)]
    pub history: bool,

    /// Emit each task's final state as a JSON line on stdout (logs move to stderr)
    #[arg(long)]
    pub json: bool,
}
