//! Concurrent registry of conversion tasks, keyed by source URL.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::error::TaskError;
use super::runner::{self, PipelineContext};
use super::state::{TaskCell, TaskSnapshot};
use crate::config::Settings;
use crate::convert::{FfmpegTranscoder, Transcoder};
use crate::extract::{MetadataToolResolver, StreamResolver};
use crate::history::HistoryStore;

/// Registry of conversion tasks with single-flight start semantics.
///
/// At most one live task exists per URL. Starting a URL whose task is
/// still running joins the existing task instead of launching another
/// pipeline; starting a URL whose task has finished replaces it with a
/// fresh one. The registry is cheap to clone and safe to share across
/// request handlers.
#[derive(Clone)]
pub struct TaskRegistry {
    tasks: Arc<DashMap<String, Arc<TaskCell>>>,
    context: Arc<PipelineContext>,
}

impl TaskRegistry {
    /// Creates a registry wired to the external resolver and transcoder
    /// tools named in `settings`.
    #[must_use]
    pub fn new(store: HistoryStore, settings: Settings) -> Self {
        let resolver: Arc<dyn StreamResolver> = Arc::new(MetadataToolResolver::new(&settings));
        let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegTranscoder::new(&settings));
        Self::with_stages(store, settings, resolver, transcoder)
    }

    /// Creates a registry with explicit stage implementations.
    #[must_use]
    pub fn with_stages(
        store: HistoryStore,
        settings: Settings,
        resolver: Arc<dyn StreamResolver>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
            context: Arc::new(PipelineContext {
                store,
                resolver,
                transcoder,
                settings,
            }),
        }
    }

    /// Starts a conversion task for `url`, or joins the one already running.
    ///
    /// Returns the snapshot observed at start time. The returned snapshot
    /// belongs to the running task for this URL, whether it was launched
    /// by this call or an earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::BlankUrl`] when `url` is empty or whitespace.
    #[instrument(skip(self))]
    pub fn start(&self, url: &str) -> Result<TaskSnapshot, TaskError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(TaskError::BlankUrl);
        }

        let (cell, launched) = match self.tasks.entry(url.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().status().is_terminal() {
                    // Finished tasks are replaced; their final state lives
                    // on in the history store.
                    let fresh = Arc::new(TaskCell::new(url.to_string()));
                    occupied.insert(Arc::clone(&fresh));
                    (fresh, true)
                } else {
                    debug!(url, "joining task already in flight");
                    (Arc::clone(occupied.get()), false)
                }
            }
            Entry::Vacant(vacant) => {
                let fresh = Arc::new(TaskCell::new(url.to_string()));
                vacant.insert(Arc::clone(&fresh));
                (fresh, true)
            }
        };

        if launched {
            info!(url, "starting conversion task");
            runner::spawn_pipeline(Arc::clone(&self.context), Arc::clone(&cell), url.to_string());
        }
        Ok(cell.snapshot())
    }

    /// Returns the current snapshot of the task for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] when no task exists for `url`.
    pub fn get_state(&self, url: &str) -> Result<TaskSnapshot, TaskError> {
        self.tasks
            .get(url.trim())
            .map(|cell| cell.snapshot())
            .ok_or_else(|| TaskError::NotFound(url.trim().to_string()))
    }

    /// Subscribes to the snapshot stream of the task for `url`.
    ///
    /// The receiver yields the current snapshot immediately, then every
    /// later snapshot in order, and closes after the terminal one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] when no task exists for `url`.
    pub fn subscribe(&self, url: &str) -> Result<mpsc::UnboundedReceiver<TaskSnapshot>, TaskError> {
        self.tasks
            .get(url.trim())
            .map(|cell| cell.subscribe())
            .ok_or_else(|| TaskError::NotFound(url.trim().to_string()))
    }

    /// Removes the finished task for `url` from the registry.
    ///
    /// The durable history record is untouched; only the in-memory entry
    /// goes away.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::StillRunning`] when the task has not reached
    /// a terminal status, and [`TaskError::NotFound`] when no task exists
    /// for `url`.
    #[instrument(skip(self))]
    pub fn clear(&self, url: &str) -> Result<(), TaskError> {
        let url = url.trim();
        match self.tasks.entry(url.to_string()) {
            Entry::Occupied(occupied) => {
                if occupied.get().status().is_terminal() {
                    occupied.remove();
                    debug!(url, "cleared finished task");
                    Ok(())
                } else {
                    Err(TaskError::StillRunning(url.to_string()))
                }
            }
            Entry::Vacant(_) => Err(TaskError::NotFound(url.to_string())),
        }
    }

    /// Returns the number of tasks currently tracked, running or finished.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true when no tasks are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn test_registry() -> TaskRegistry {
        let db = Database::new_in_memory().await.unwrap();
        let store = HistoryStore::new(db);
        // A nonexistent binary makes every pipeline fail fast, which is
        // all these registry-contract tests need.
        let settings = Settings::new()
            .with_resolver_bin("/nonexistent/resolver-bin")
            .with_transcoder_bin("/nonexistent/transcoder-bin");
        TaskRegistry::new(store, settings)
    }

    #[tokio::test]
    async fn test_start_rejects_blank_url() {
        let registry = test_registry().await;
        assert!(matches!(registry.start(""), Err(TaskError::BlankUrl)));
        assert!(matches!(registry.start("   "), Err(TaskError::BlankUrl)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_start_trims_url_before_keying() {
        let registry = test_registry().await;
        registry.start("  http://example.com/v1  ").unwrap();
        assert!(registry.get_state("http://example.com/v1").is_ok());
    }

    #[tokio::test]
    async fn test_get_state_unknown_url_is_not_found() {
        let registry = test_registry().await;
        assert!(matches!(
            registry.get_state("http://example.com/unknown"),
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_unknown_url_is_not_found() {
        let registry = test_registry().await;
        assert!(matches!(
            registry.subscribe("http://example.com/unknown"),
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_unknown_url_is_not_found() {
        let registry = test_registry().await;
        assert!(matches!(
            registry.clear("http://example.com/unknown"),
            Err(TaskError::NotFound(_))
        ));
    }
}
