//! The watch loop: change events in, index files out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  WatchMessage  ┌────────────┐  Admission  ┌────────────────────┐
//! │ FileWatcher  │ ─────────────► │ event loop │ ──────────► │ extraction task    │
//! │ (OS thread)  │   (bounded)    │ EventGate  │  (tracked)  │ sleep(delay)       │
//! └──────────────┘                │ EventLog   │             │ settle()           │
//!                                 └────────────┘             │ spawn_blocking:    │
//!                                                            │   Extractor        │
//!                                                            │   put_ordered      │
//!                                                            │   Materializer     │
//!                                                            └────────────────────┘
//! ```
//!
//! The event loop is the only consumer of watcher messages and the only
//! writer of the event log. Extraction never runs on it. Each accepted event
//! gets a sequence number so that a slow extraction cannot overwrite the
//! result of a later one for the same file.
//!
//! # Shutdown
//!
//! When the [`CancellationToken`] fires the loop stops receiving, waits for
//! every in-flight extraction, writes the index one last time, stops the
//! watcher and closes the event log.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use dw_core::{Config, OutputMode};
use dw_watcher::{
    Admission, ChangeEvent, EventGate, EventLog, ExtensionFilter, FileWatcher, Operation,
    SkipDirFilter, TreeWalker, WatchMessage, WatchOptions, WatchedTree,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::IndexError;
use crate::extractor::Extractor;
use crate::initial::InitialPass;
use crate::materialize::Materializer;
use crate::retry::{Clock, RetryPolicy};
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::store::DocumentStore;

/// What a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Counters at shutdown.
    pub stats: StatsSnapshot,
    /// Paths in the index at shutdown.
    pub indexed_files: usize,
    /// The event log written during the run.
    pub log_path: Utf8PathBuf,
}

/// State shared with extraction tasks.
#[derive(Debug)]
struct Shared {
    store: DocumentStore,
    stats: PipelineStats,
    extractor: Extractor,
    materializer: Materializer,
}

impl Shared {
    /// Extracts one accepted event and publishes the result.
    fn process(&self, path: &Utf8Path, seq: u64) {
        match self.extractor.extract(path) {
            Ok(record) => {
                if self.store.put_ordered(path, seq, record) {
                    self.stats.increment_extracted();
                    tracing::debug!(path = %path, seq, "Indexed file");
                    self.write(Some(path));
                } else {
                    self.stats.increment_stale();
                    tracing::debug!(path = %path, seq, "Dropped stale extraction");
                }
            }
            Err(error) => {
                self.stats.increment_failed();
                tracing::warn!(path = %path, error = %error, "Keeping previous record");
            }
        }
    }

    fn write(&self, changed: Option<&Utf8Path>) {
        if let Err(error) = self.materializer.materialize(&self.store, changed) {
            self.stats.increment_materialize_failures();
            tracing::warn!(error = %error, "Failed to write index");
        }
    }
}

/// Watches a Go source tree and keeps its documentation index current.
///
/// # Examples
///
/// ```no_run
/// use dw_core::Config;
/// use dw_index::WatchLoop;
/// use camino::Utf8Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), dw_index::IndexError> {
/// let cancel = CancellationToken::new();
/// let watch_loop = WatchLoop::new(Config::default(), Utf8Path::new("./src"))?;
///
/// let stopper = cancel.clone();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     stopper.cancel();
/// });
///
/// let summary = watch_loop.run(cancel).await?;
/// println!("{} files indexed", summary.indexed_files);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WatchLoop {
    config: Config,
    tree: WatchedTree,
    skip: SkipDirFilter,
    log: EventLog,
    shared: Shared,
}

impl WatchLoop {
    /// Validates `config`, resolves `root` and opens today's event log.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Config`] for an invalid configuration, or
    /// [`IndexError::Watch`] if the root is not a directory or the event log
    /// cannot be opened.
    pub fn new(config: Config, root: &Utf8Path) -> Result<Self, IndexError> {
        config.validate()?;

        let tree = WatchedTree::new(root)?;
        let log = EventLog::open_today(&config.output.log_root())?;
        let skip = skip_filter(&config);
        let shared = Shared {
            store: DocumentStore::new(),
            stats: PipelineStats::new(),
            extractor: Extractor::new(&config.extract),
            materializer: Materializer::new(&config.output, tree.display_root()),
        };

        Ok(Self {
            config,
            tree,
            skip,
            log,
            shared,
        })
    }

    /// Replaces the clock used between extraction attempts.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        let policy = RetryPolicy::from_config(&self.config.extract);
        self.shared.extractor = Extractor::with_clock(policy, clock);
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the event log for this run.
    #[must_use]
    pub fn log_path(&self) -> &Utf8Path {
        self.log.path()
    }

    /// Runs until `cancel` fires or the watcher stops.
    ///
    /// # Errors
    ///
    /// Startup failures are returned: preparing the mirror tree, a panicked
    /// initial pass, or registering the root. Once the loop is running,
    /// per-file failures are logged and never end it.
    pub async fn run(self, cancel: CancellationToken) -> Result<RunSummary, IndexError> {
        let Self {
            config,
            tree,
            skip,
            log,
            shared,
        } = self;
        let shared = Arc::new(shared);
        let options = WatchOptions {
            skip,
            ..WatchOptions::from_config(&config.watch)
        };
        let filter = ExtensionFilter::from_owned(config.extract.extensions.clone());

        if shared.materializer.mode() == OutputMode::Mirror {
            let dirs = TreeWalker::new(tree.display_root(), options.skip.clone()).directories();
            shared.materializer.prepare_mirror(&dirs)?;
        }

        if config.extract.initial_index {
            let pass = InitialPass::new(tree.display_root(), options.skip.clone(), filter.clone());
            let worker = Arc::clone(&shared);
            tokio::task::spawn_blocking(move || {
                pass.run(&worker.store, &worker.stats);
                worker.write(None);
            })
            .await
            .map_err(|e| IndexError::Task(e.to_string()))?;
        }

        let root = tree.display_root().to_owned();
        let mut watcher = FileWatcher::start(tree, filter, options).await?;
        tracing::info!(root = %root, "Watching for changes");

        let mut dispatcher = Dispatcher {
            gate: EventGate::from_config(&config.watch),
            log,
            shared: Arc::clone(&shared),
            tracker: TaskTracker::new(),
            next_seq: 0,
        };

        loop {
            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                message = watcher.recv() => message,
            };

            match message {
                Some(WatchMessage::Event(event)) => dispatcher.dispatch(event),
                Some(WatchMessage::Error(error)) => {
                    tracing::warn!(error = %error, "Watcher error");
                }
                None => {
                    tracing::warn!("Watcher stopped unexpectedly");
                    break;
                }
            }
        }

        let Dispatcher { log, tracker, .. } = dispatcher;
        tracker.close();
        tracing::debug!(in_flight = tracker.len(), "Waiting for extractions");
        tracker.wait().await;

        let worker = Arc::clone(&shared);
        let flushed = tokio::task::spawn_blocking(move || worker.write(None)).await;
        if let Err(error) = flushed {
            tracing::warn!(error = %error, "Final index write failed");
        }

        if let Err(error) = watcher.shutdown().await {
            tracing::warn!(error = %error, "Watcher did not stop cleanly");
        }

        let log_path = log.path().to_owned();
        if let Err(error) = log.close() {
            tracing::warn!(error = %error, "Failed to close event log");
        }

        let summary = RunSummary {
            stats: shared.stats.snapshot(),
            indexed_files: shared.store.len(),
            log_path,
        };
        tracing::info!(
            indexed = summary.indexed_files,
            received = summary.stats.events_received,
            accepted = summary.stats.events_accepted,
            suppressed = summary.stats.events_suppressed,
            failed = summary.stats.extractions_failed,
            "Watch loop stopped"
        );
        Ok(summary)
    }
}

/// The configured directory names plus the directories this run writes to.
///
/// Output locations are matched by canonical path, so a source package that
/// happens to be called `logs` is still indexed. The log directory exists by
/// the time this runs, so the base directory resolves.
fn skip_filter(config: &Config) -> SkipDirFilter {
    let output = &config.output;
    let base = output.base_dir.canonicalize_utf8().unwrap_or_else(|error| {
        tracing::warn!(base = %output.base_dir, error = %error, "Cannot resolve output directory");
        output.base_dir.clone()
    });
    SkipDirFilter::new(config.watch.skip_dirs.iter().cloned())
        .with_excluded(base.join(&output.log_dir))
        .with_excluded(base.join(&output.mirror_dir))
}

/// Per-event decisions made on the loop task.
struct Dispatcher {
    gate: EventGate,
    log: EventLog,
    shared: Arc<Shared>,
    tracker: TaskTracker,
    next_seq: u64,
}

impl Dispatcher {
    fn dispatch(&mut self, event: ChangeEvent) {
        let shared = Arc::clone(&self.shared);
        let stats = &shared.stats;
        stats.increment_received();

        match event.operation {
            Operation::Remove => {
                stats.increment_ignored();
                tracing::trace!(path = %event.path, "Ignoring removal");
            }
            Operation::Create | Operation::Write => match self.gate.accept(&event) {
                Some(admission) => {
                    stats.increment_accepted();
                    self.record(&event);
                    self.next_seq += 1;
                    self.schedule(event.path, self.next_seq, admission);
                }
                None => {
                    stats.increment_suppressed();
                    tracing::trace!(path = %event.path, op = %event.operation, "Suppressed duplicate");
                }
            },
            Operation::Rename | Operation::Chmod => self.record(&event),
        }
    }

    fn record(&mut self, event: &ChangeEvent) {
        if let Err(error) = self.log.record(event) {
            tracing::warn!(error = %error, "Failed to write event log");
        }
    }

    fn schedule(&self, path: Utf8PathBuf, seq: u64, admission: Admission) {
        let shared = Arc::clone(&self.shared);
        self.tracker.spawn(async move {
            if !admission.delay().is_zero() {
                tokio::time::sleep(admission.delay()).await;
            }
            admission.settle();

            let task_path = path.clone();
            let result =
                tokio::task::spawn_blocking(move || shared.process(&task_path, seq)).await;
            if let Err(error) = result {
                tracing::warn!(path = %path, error = %error, "Extraction task failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8 temp path")
    }

    fn config_for(out: &Utf8Path) -> Config {
        let mut config = Config::default();
        config.output.base_dir = out.to_owned();
        config
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let root = TempDir::new().expect("temp");
        let out = TempDir::new().expect("temp");
        let mut config = config_for(&utf8(&out));
        config.extract.max_attempts = 0;

        let err = WatchLoop::new(config, &utf8(&root)).unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let out = TempDir::new().expect("temp");
        let err = WatchLoop::new(config_for(&utf8(&out)), Utf8Path::new("/nonexistent/docwatch"))
            .unwrap_err();
        assert!(matches!(err, IndexError::Watch(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_new_opens_event_log() {
        let root = TempDir::new().expect("temp");
        let out = TempDir::new().expect("temp");
        let watch_loop = WatchLoop::new(config_for(&utf8(&out)), &utf8(&root)).expect("loop");

        assert!(watch_loop.log_path().starts_with(utf8(&out).join("logs")));
        assert!(watch_loop.log_path().exists());
    }

    fn shared_for(config: &Config, root: &Utf8Path) -> Shared {
        Shared {
            store: DocumentStore::new(),
            stats: PipelineStats::new(),
            extractor: Extractor::new(&config.extract),
            materializer: Materializer::new(&config.output, root),
        }
    }

    #[test]
    fn test_failed_write_keeps_record_until_next_write() {
        let root = TempDir::new().expect("temp");
        let out = TempDir::new().expect("temp");
        let source = utf8(&root).join("a.go");
        std::fs::write(&source, "package a\n").expect("write");

        let config = config_for(&utf8(&out));
        let aggregate = config.output.aggregate_path();
        let shared = shared_for(&config, &utf8(&root));

        // A directory where the index file belongs makes the rename fail
        std::fs::create_dir(&aggregate).expect("mkdir");
        shared.process(&source, 1);

        assert_eq!(shared.store.get(&source).map(|r| r.package).as_deref(), Some("a"));
        let stats = shared.stats.snapshot();
        assert_eq!(stats.extractions_succeeded, 1);
        assert_eq!(stats.materialization_failures, 1);

        std::fs::remove_dir(&aggregate).expect("rmdir");
        std::fs::write(&source, "package b\n").expect("write");
        shared.process(&source, 2);

        let written = std::fs::read_to_string(&aggregate).expect("index written");
        assert!(written.contains(r#""package": "b""#));
        assert_eq!(shared.stats.snapshot().materialization_failures, 1);
    }

    #[tokio::test]
    async fn test_output_dirs_inside_root_are_not_indexed() {
        let root = TempDir::new().expect("temp");
        let root_path = utf8(&root);
        std::fs::create_dir_all(root_path.join("internal/logs")).expect("mkdir");
        std::fs::create_dir_all(root_path.join("references")).expect("mkdir");
        std::fs::write(root_path.join("main.go"), "package main\n").expect("write");
        std::fs::write(root_path.join("internal/logs/logger.go"), "package logs\n").expect("write");
        std::fs::write(root_path.join("references/stale.go"), "package stale\n").expect("write");

        let watch_loop = WatchLoop::new(config_for(&root_path), &root_path).expect("loop");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = watch_loop.run(cancel).await.expect("run");

        assert_eq!(summary.indexed_files, 2);
        assert_eq!(summary.stats.extractions_succeeded, 2);
        let written = std::fs::read_to_string(root_path.join("reference.json")).expect("index");
        assert!(written.contains("internal/logs/logger.go"));
        assert!(!written.contains("stale.go"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_still_writes_index() {
        let root = TempDir::new().expect("temp");
        let out = TempDir::new().expect("temp");
        std::fs::write(root.path().join("a.go"), "package a\n").expect("write");

        let config = config_for(&utf8(&out));
        let aggregate = config.output.aggregate_path();
        let watch_loop = WatchLoop::new(config, &utf8(&root)).expect("loop");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = watch_loop.run(cancel).await.expect("run");

        assert_eq!(summary.indexed_files, 1);
        assert_eq!(summary.stats.extractions_succeeded, 1);
        assert!(aggregate.exists());
    }
}
