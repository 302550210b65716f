//! Pipeline runner: drives extraction then conversion for one task.
//!
//! One runner owns one task for its whole lifetime; nothing else mutates
//! the task's state once the runner has been spawned. Every fault,
//! including a panicking stage, is caught here and collapses the task to
//! failed, so no task can be left stuck in running.
//!
//! Durability checkpoints are deliberately sparse: one history insert when
//! the task starts and one in-place update at the terminal outcome. Log
//! lines in between are published to subscribers but not persisted
//! individually.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::state::TaskCell;
use crate::config::Settings;
use crate::convert::Transcoder;
use crate::extract::StreamResolver;
use crate::filename;
use crate::history::{HistoryStore, NewConversionRecord};
use crate::sink::LogSink;

/// Shared collaborators handed to every spawned pipeline.
pub(crate) struct PipelineContext {
    pub(crate) store: HistoryStore,
    pub(crate) resolver: Arc<dyn StreamResolver>,
    pub(crate) transcoder: Arc<dyn Transcoder>,
    pub(crate) settings: Settings,
}

/// Forwards stage log lines into the owning task's state cell.
struct CellSink(Arc<TaskCell>);

impl LogSink for CellSink {
    fn append(&self, line: &str) {
        self.0.append_log(line);
    }
}

/// What a fully successful pipeline produced.
struct StageOutcome {
    title: String,
    output_path: PathBuf,
}

/// Launches the pipeline for one task on its own tokio task.
///
/// The pipeline runs in an inner spawned task so that a panic anywhere in
/// a stage surfaces as a join error here instead of silently orphaning
/// the task in running status.
pub(crate) fn spawn_pipeline(ctx: Arc<PipelineContext>, cell: Arc<TaskCell>, url: String) {
    tokio::spawn(async move {
        let pipeline = tokio::spawn(run_pipeline(
            Arc::clone(&ctx),
            Arc::clone(&cell),
            url.clone(),
        ));
        if let Err(join_error) = pipeline.await {
            warn!(url = %url, error = %join_error, "pipeline task aborted");
            finalize_failure(&ctx, &cell, format!("unexpected fault: {join_error}")).await;
        }
    });
}

async fn run_pipeline(ctx: Arc<PipelineContext>, cell: Arc<TaskCell>, url: String) {
    // Checkpoint 1: a durable running record exists before any stage runs.
    let snapshot = cell.snapshot();
    let initial_logs = snapshot.logs.join("\n");
    let record = NewConversionRecord {
        url: &url,
        timestamp_ms: snapshot.started_at_ms,
        logs: &initial_logs,
    };
    match ctx.store.insert(&record).await {
        Ok(id) => cell.set_record_id(id),
        Err(err) => {
            finalize_failure(&ctx, &cell, format!("could not record conversion start: {err}"))
                .await;
            return;
        }
    }

    match run_stages(&ctx, &cell, &url).await {
        Ok(outcome) => {
            debug!(url = %url, path = %outcome.output_path.display(), "conversion succeeded");
            let line = format!("conversion complete: {}", outcome.output_path.display());
            cell.finish_success(outcome.title, outcome.output_path, line);
            persist_terminal(&ctx, &cell).await;
        }
        Err(diagnostic) => {
            finalize_failure(&ctx, &cell, diagnostic).await;
        }
    }
}

/// Runs extraction then conversion, returning a human-readable diagnostic
/// on any failure. Stage errors never propagate past this boundary.
async fn run_stages(
    ctx: &PipelineContext,
    cell: &Arc<TaskCell>,
    url: &str,
) -> Result<StageOutcome, String> {
    let sink = CellSink(Arc::clone(cell));
    let stage_timeout = ctx.settings.stage_timeout;

    let resolved = match timeout(stage_timeout, ctx.resolver.resolve(url, &sink)).await {
        Ok(Ok(media)) => media,
        Ok(Err(err)) => return Err(format!("extraction failed: {err}")),
        Err(_) => {
            return Err(format!(
                "extraction timed out after {}s",
                stage_timeout.as_secs()
            ));
        }
    };

    // Derive the destination from the sanitized title, falling back to a
    // timestamped stem when the resolver gave nothing usable.
    let started_at_ms = cell.snapshot().started_at_ms;
    let stem = resolved
        .title
        .as_deref()
        .map(filename::sanitize_title)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| filename::fallback_stem(started_at_ms));
    let title = resolved.title.clone().unwrap_or_else(|| stem.clone());

    tokio::fs::create_dir_all(&ctx.settings.output_dir)
        .await
        .map_err(|err| {
            format!(
                "could not create output directory {}: {err}",
                ctx.settings.output_dir.display()
            )
        })?;
    let dest = filename::reserve_output_path(&ctx.settings.output_dir, &stem)
        .map_err(|err| format!("could not reserve output path for '{stem}': {err}"))?;
    cell.append_log(format!("converting to {}", dest.display()));

    match timeout(
        stage_timeout,
        ctx.transcoder.transcode(&resolved.stream_url, &dest, &sink),
    )
    .await
    {
        Ok(Ok(())) => Ok(StageOutcome {
            title,
            output_path: dest,
        }),
        Ok(Err(err)) => {
            discard_partial_output(&dest).await;
            Err(format!("conversion failed: {err}"))
        }
        Err(_) => {
            discard_partial_output(&dest).await;
            Err(format!(
                "conversion timed out after {}s",
                stage_timeout.as_secs()
            ))
        }
    }
}

/// Removes the reserved destination and the transcoder's temp sibling.
///
/// A timed-out transcode is dropped mid-run, so its own cleanup never
/// executes and the temp file would otherwise survive in the shared
/// output directory.
async fn discard_partial_output(dest: &Path) {
    let _ = tokio::fs::remove_file(dest).await;
    let _ = tokio::fs::remove_file(crate::convert::part_path(dest)).await;
}

/// Fails the task with a final diagnostic line and persists the outcome.
async fn finalize_failure(ctx: &PipelineContext, cell: &Arc<TaskCell>, diagnostic: String) {
    cell.finish_failed(diagnostic);
    persist_terminal(ctx, cell).await;
}

/// Checkpoint 2: updates the task's history record with its terminal state.
///
/// Persistence failures are logged, not propagated: the in-memory task
/// state is already terminal and observers must still see it.
async fn persist_terminal(ctx: &PipelineContext, cell: &Arc<TaskCell>) {
    let snapshot = cell.snapshot();
    let Some(id) = snapshot.record_id else {
        return;
    };
    let logs = snapshot.logs.join("\n");
    if let Err(err) = ctx
        .store
        .update_terminal(
            id,
            snapshot.status,
            snapshot.output_path.as_deref(),
            snapshot.title.as_deref(),
            &logs,
        )
        .await
    {
        warn!(url = %snapshot.url, error = %err, "failed to persist terminal history record");
    }
}
