//! CLI entry point for the mp3grab tool.

use std::io::{self, IsTerminal, Read};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use mp3grab_core::{
    Database, HistoryStore, Settings, TaskRegistry, TaskSnapshot, TaskStatus,
    history::DEFAULT_HISTORY_LIMIT,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // JSON mode owns stdout; logs move to stderr so the output stays
    // machine-readable.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    debug!(?args, "CLI arguments parsed");

    let db = Database::new(&args.db_path).await?;
    let store = HistoryStore::new(db.clone());

    // Tasks interrupted by a previous shutdown can never finish; mark them
    // failed so the history never shows a phantom running conversion.
    let reconciled = store.reconcile_orphaned().await?;
    if reconciled > 0 {
        warn!(count = reconciled, "marked interrupted conversions as failed");
    }

    if args.history {
        print_history(&store).await?;
        db.close().await;
        return Ok(());
    }

    // Read input: from positional args or stdin
    let input_text = if args.urls.is_empty() {
        if io::stdin().is_terminal() {
            info!("No input provided. Pipe URLs via stdin or pass as arguments.");
            info!("Example: echo 'https://example.com/watch?v=abc' | mp3grab");
            db.close().await;
            return Ok(());
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        args.urls.join("\n")
    };

    let urls = parse_urls(&input_text);
    if urls.is_empty() {
        info!("No URLs found in input");
        db.close().await;
        return Ok(());
    }
    info!(urls = urls.len(), "Starting conversions");

    let settings = Settings::new()
        .with_output_dir(&args.output_dir)
        .with_resolver_bin(&args.resolver_bin)
        .with_transcoder_bin(&args.ffmpeg_bin)
        .with_audio_quality(args.quality)
        .with_stage_timeout(Duration::from_secs(args.stage_timeout));
    let registry = TaskRegistry::new(store, settings);

    // Each task gets an observer that relays its log trail as it grows
    // and reports the terminal status.
    let mut observers = Vec::with_capacity(urls.len());
    for url in &urls {
        registry.start(url)?;
        let rx = registry.subscribe(url)?;
        observers.push(tokio::spawn(observe_task(rx)));
    }

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for observer in observers {
        match observer.await? {
            Some(snapshot) => {
                if args.json {
                    println!("{}", serde_json::to_string(&snapshot)?);
                }
                match snapshot.status {
                    TaskStatus::Success => succeeded += 1,
                    _ => failed += 1,
                }
            }
            None => failed += 1,
        }
    }

    info!(
        succeeded,
        failed,
        total = urls.len(),
        "Conversions complete"
    );

    db.close().await;
    if failed > 0 {
        anyhow::bail!("{failed} of {} conversions failed", urls.len());
    }
    Ok(())
}

/// Splits raw input into unique, nonempty URL lines, preserving order.
fn parse_urls(input: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !urls.iter().any(|existing| existing == line) {
            urls.push(line.to_string());
        }
    }
    urls
}

/// Relays a task's snapshot stream to the log until it reaches a terminal
/// status, then returns the final snapshot.
async fn observe_task(mut rx: mpsc::UnboundedReceiver<TaskSnapshot>) -> Option<TaskSnapshot> {
    let mut printed = 0usize;
    let mut last = None;
    while let Some(snapshot) = rx.recv().await {
        for line in &snapshot.logs[printed.min(snapshot.logs.len())..] {
            info!(url = %snapshot.url, "{line}");
        }
        printed = snapshot.logs.len();
        last = Some(snapshot);
    }
    last
}

/// Prints the most recent conversion records, newest first.
async fn print_history(store: &HistoryStore) -> Result<()> {
    let records = store.list_recent(DEFAULT_HISTORY_LIMIT).await?;
    if records.is_empty() {
        println!("no conversions recorded");
        return Ok(());
    }
    for record in records {
        let title = record.title.as_deref().unwrap_or("<unresolved>");
        let path = record.file_path.as_deref().unwrap_or("-");
        println!(
            "{:>6}  {:<7}  {}  {}  {}",
            record.id,
            record.status().as_str(),
            record.timestamp_ms,
            title,
            path
        );
        debug!(url = %record.url, "history record");
    }
    Ok(())
}
