//! File watcher with dynamic directory registration and async event streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges the synchronous
//! `notify` watcher to the async tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  Blocking Thread (spawn_blocking)                │
//! │  ┌───────────────────┐  std mpsc  ┌───────────────────────────┐  │
//! │  │ RecommendedWatcher│ ─────────► │ Bridge                    │  │
//! │  │ (one non-recursive│  Control   │ - Operation mapping       │  │
//! │  │  watch per dir)   │            │ - new-dir registration    │  │
//! │  └───────────────────┘            │ - path filtering          │  │
//! │            ▲  watch(new dir)      └──────────┬────────────────┘  │
//! │            └─────────────────────────────────┘                   │
//! └──────────────────────────────────────────────│───────────────────┘
//!                                  blocking_send │ WatchMessage
//!                                                ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Async Runtime (tokio)                        │
//! │   FileWatcher::recv() ──► watch loop                             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every directory is registered individually and non-recursively: the root
//! at start (failure is fatal), existing subdirectories from an explicit
//! walk, and directories created later as their `Create` events arrive.
//! Source files already inside a newly registered directory are reported as
//! synthetic `Create` events, since they may have been written before the
//! watch was in place.
//!
//! The OS facility may coalesce or drop notifications under heavy load
//! (inotify queue overflow); no attempt is made to compensate.

use std::sync::mpsc as std_mpsc;

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use dw_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{ChangeEvent, Operation, WatchMessage};
use crate::filter::{AcceptAllFilter, FileFilter, SkipDirFilter};
use crate::tree::WatchedTree;
use crate::walker::TreeWalker;

/// Settings for [`FileWatcher::start`].
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Capacity of the channel to the async consumer.
    pub channel_capacity: usize,
    /// Whether directories created after start are registered.
    pub register_new_dirs: bool,
    /// Directories never registered or reported.
    pub skip: SkipDirFilter,
}

impl WatchOptions {
    /// Builds options from the watch configuration.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity.max(1),
            register_new_dirs: config.register_new_dirs,
            skip: SkipDirFilter::new(config.skip_dirs.iter().cloned()),
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

enum Control {
    Notify(notify::Result<notify::Event>),
    Shutdown,
}

/// A file watcher that streams filtered change events to an async context.
///
/// # Lifecycle
///
/// 1. **Start**: [`FileWatcher::start`] registers the root and every
///    subdirectory, then moves the OS watcher into a blocking task.
/// 2. **Receive**: [`FileWatcher::recv`] yields [`WatchMessage`]s.
/// 3. **Shutdown**: [`FileWatcher::shutdown`] stops the task and waits for
///    it; the OS watcher is dropped there, releasing every watch. Dropping
///    the `FileWatcher` sends the same signal without waiting.
///
/// # Examples
///
/// ```no_run
/// use dw_watcher::{ExtensionFilter, FileWatcher, WatchMessage, WatchOptions, WatchedTree};
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), dw_watcher::WatchError> {
/// let tree = WatchedTree::new(Utf8Path::new("./src"))?;
/// let mut watcher = FileWatcher::start(tree, ExtensionFilter::go(), WatchOptions::default()).await?;
///
/// while let Some(message) = watcher.recv().await {
///     if let WatchMessage::Event(event) = message {
///         println!("{} {}", event.operation, event.path);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    control_tx: Option<std_mpsc::Sender<Control>>,
    task_handle: Option<JoinHandle<()>>,
    event_rx: mpsc::Receiver<WatchMessage>,
    tree: WatchedTree,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.tree.display_root())
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Registers the tree with the OS and starts streaming events.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the OS watcher cannot be created or
    /// the root cannot be registered. Subdirectory registration failures are
    /// logged and skipped.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn start<F: FileFilter>(
        mut tree: WatchedTree,
        filter: F,
        options: WatchOptions,
    ) -> Result<Self, WatchError> {
        let (control_tx, control_rx) = std_mpsc::channel();
        let handler_tx = control_tx.clone();
        let mut watcher = notify::recommended_watcher(move |res| {
            // Fails only once the bridge has stopped
            let _ = handler_tx.send(Control::Notify(res));
        })?;

        let root = tree.canonical_root().to_owned();
        watcher.watch(root.as_std_path(), RecursiveMode::NonRecursive)?;
        tree.register(root.clone());

        let walker = TreeWalker::new(&root, options.skip.clone());
        for dir in walker.directories() {
            register_dir(&mut watcher, &mut tree, dir);
        }

        tracing::info!(
            root = %tree.display_root(),
            directories = tree.registered_count(),
            "File watcher started"
        );

        let (event_tx, event_rx) = mpsc::channel(options.channel_capacity.max(1));
        let snapshot = tree.clone();
        let bridge = Bridge {
            watcher,
            tree,
            filter,
            options,
            event_tx,
        };
        let task_handle = tokio::task::spawn_blocking(move || bridge.run(&control_rx));

        Ok(Self {
            control_tx: Some(control_tx),
            task_handle: Some(task_handle),
            event_rx,
            tree: snapshot,
        })
    }

    /// Receives the next message.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<WatchMessage> {
        self.event_rx.recv().await
    }

    /// The watched tree as registered at start.
    #[must_use]
    pub fn tree(&self) -> &WatchedTree {
        &self.tree
    }

    /// Returns `true` if the watcher task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.control_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher task and waits for it to release the OS watcher.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelClosed`] if the watcher task panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        // Unblocks a task waiting on a full channel
        self.event_rx.close();

        if let Some(tx) = self.control_tx.take() {
            // The task may already have stopped
            let _ = tx.send(Control::Shutdown);
        }

        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|_join_error| WatchError::ChannelClosed)?;
        }

        tracing::info!(root = %self.tree.display_root(), "File watcher stopped");
        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.control_tx.take() {
            let _ = tx.send(Control::Shutdown);
        }
    }
}

/// Registers one directory unless it is already registered.
fn register_dir(watcher: &mut RecommendedWatcher, tree: &mut WatchedTree, dir: Utf8PathBuf) -> bool {
    if tree.is_registered(&dir) {
        return false;
    }
    match watcher.watch(dir.as_std_path(), RecursiveMode::NonRecursive) {
        Ok(()) => {
            tracing::trace!(dir = %dir, "Registered directory");
            tree.register(dir)
        }
        Err(error) => {
            tracing::warn!(dir = %dir, error = %error, "Failed to register directory");
            false
        }
    }
}

/// State owned by the blocking thread.
struct Bridge<F> {
    watcher: RecommendedWatcher,
    tree: WatchedTree,
    filter: F,
    options: WatchOptions,
    event_tx: mpsc::Sender<WatchMessage>,
}

impl<F: FileFilter> Bridge<F> {
    fn run(mut self, control_rx: &std_mpsc::Receiver<Control>) {
        while let Ok(control) = control_rx.recv() {
            let keep_going = match control {
                Control::Shutdown => false,
                Control::Notify(Ok(event)) => self.handle(event),
                Control::Notify(Err(error)) => self.send(WatchMessage::Error(error.into())),
            };
            if !keep_going {
                break;
            }
        }
        // Dropping `self.watcher` here unregisters every directory
    }

    /// Returns `false` once the consumer is gone.
    fn handle(&mut self, event: notify::Event) -> bool {
        let Some(operation) = Operation::from_kind(&event.kind) else {
            return true;
        };

        for path in event.paths {
            let path = match Utf8PathBuf::try_from(path) {
                Ok(path) => path,
                Err(e) => {
                    let error = WatchError::non_utf8_path(e.into_path_buf());
                    tracing::warn!(error = %error, "Skipping file event");
                    continue;
                }
            };

            if self.is_skipped(&path) {
                continue;
            }

            match operation {
                Operation::Create if path.is_dir() => {
                    if self.options.register_new_dirs && !self.register_subtree(&path) {
                        return false;
                    }
                    continue;
                }
                Operation::Remove | Operation::Rename if self.tree.forget(&path) => {
                    tracing::debug!(dir = %path, "Directory no longer watched");
                    continue;
                }
                _ => {}
            }

            if !self.forward(&path, operation) {
                return false;
            }
        }

        true
    }

    /// Registers `dir` and everything below it, then reports the source files
    /// already present as created.
    fn register_subtree(&mut self, dir: &Utf8Path) -> bool {
        let walker = TreeWalker::new(dir, self.options.skip.clone());
        let mut added = 0_usize;
        for sub in walker.directories() {
            if register_dir(&mut self.watcher, &mut self.tree, sub) {
                added += 1;
            }
        }
        tracing::debug!(dir = %dir, added, "Registered new directory");

        walker
            .files(&AcceptAllFilter)
            .into_iter()
            .all(|file| self.forward(&file, Operation::Create))
    }

    /// Filters and sends one event. Returns `false` once the consumer is gone.
    fn forward(&self, path: &Utf8Path, operation: Operation) -> bool {
        let relative = self.tree.relative(path).unwrap_or(path);
        if !self.filter.should_process(relative) {
            tracing::trace!(path = %path, "Filtered out file event");
            return true;
        }

        let event = ChangeEvent::new(self.tree.display_path(path), operation);
        self.send(WatchMessage::Event(event))
    }

    /// Paths from the OS are canonical, like the excluded locations.
    fn is_skipped(&self, path: &Utf8Path) -> bool {
        self.options.skip.excludes(path)
            || self
                .tree
                .relative(path)
                .is_some_and(|rel| !self.options.skip.should_process(rel))
    }

    fn send(&self, message: WatchMessage) -> bool {
        if self.event_tx.blocking_send(message).is_err() {
            tracing::debug!("Event channel closed, stopping watcher");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ExtensionFilter;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn temp_tree() -> (TempDir, Utf8PathBuf, WatchedTree) {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8 temp path");
        let tree = WatchedTree::new(&root).expect("tree");
        (temp, root, tree)
    }

    /// Waits until an event for `path` arrives or the timeout elapses.
    async fn wait_for(watcher: &mut FileWatcher, path: &Utf8Path) -> Option<ChangeEvent> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let message = tokio::time::timeout_at(deadline, watcher.recv()).await.ok()??;
            if let WatchMessage::Event(event) = message {
                if event.path == path {
                    return Some(event);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_watcher_start_registers_subdirectories() {
        let (_temp, root, tree) = temp_tree();
        fs::create_dir_all(root.join("pkg/util")).expect("mkdir");
        fs::create_dir_all(root.join(".git/objects")).expect("mkdir");

        let watcher = FileWatcher::start(tree, AcceptAllFilter, WatchOptions::default())
            .await
            .expect("Failed to start watcher");

        assert!(watcher.is_running());
        assert_eq!(watcher.tree().registered_count(), 3);
        watcher.shutdown().await.expect("Shutdown failed");
    }

    #[tokio::test]
    async fn test_watcher_reports_go_writes() {
        let (_temp, root, tree) = temp_tree();
        let mut watcher = FileWatcher::start(tree, ExtensionFilter::go(), WatchOptions::default())
            .await
            .expect("Failed to start watcher");

        let file = root.join("math.go");
        fs::write(&file, "package math\n").expect("write");

        let event = wait_for(&mut watcher, &file).await;
        watcher.shutdown().await.expect("Shutdown failed");

        let event = event.expect("no event for math.go");
        assert!(event.operation.is_content_change());
    }

    #[tokio::test]
    async fn test_watcher_registers_new_directories() {
        let (_temp, root, tree) = temp_tree();
        let mut watcher = FileWatcher::start(tree, ExtensionFilter::go(), WatchOptions::default())
            .await
            .expect("Failed to start watcher");

        fs::create_dir_all(root.join("later/inner")).expect("mkdir");
        fs::write(root.join("later/inner/early.go"), "package inner\n").expect("write");
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(root.join("later/inner/late.go"), "package inner\n").expect("write");

        let late = wait_for(&mut watcher, &root.join("later/inner/late.go")).await;
        watcher.shutdown().await.expect("Shutdown failed");

        assert!(late.is_some(), "file in a directory created after start was not reported");
    }

    #[tokio::test]
    async fn test_watcher_reports_user_dir_named_like_output() {
        let (_temp, root, tree) = temp_tree();
        fs::create_dir_all(root.join("internal/logs")).expect("mkdir");
        fs::create_dir_all(root.join("out/logs")).expect("mkdir");

        let canonical = tree.canonical_root().to_owned();
        let options = WatchOptions {
            skip: SkipDirFilter::new([".git"]).with_excluded(canonical.join("out/logs")),
            ..WatchOptions::default()
        };
        let mut watcher = FileWatcher::start(tree, ExtensionFilter::go(), options)
            .await
            .expect("Failed to start watcher");
        assert_eq!(watcher.tree().registered_count(), 4);

        fs::write(root.join("out/logs/ignored.go"), "package ignored\n").expect("write");
        let file = root.join("internal/logs/logger.go");
        fs::write(&file, "package logs\n").expect("write");

        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while let Ok(Some(message)) = tokio::time::timeout_at(deadline, watcher.recv()).await {
            if let WatchMessage::Event(event) = message {
                let done = event.path == file;
                seen.push(event.path);
                if done {
                    break;
                }
            }
        }
        watcher.shutdown().await.expect("Shutdown failed");

        assert!(seen.contains(&file), "no event for internal/logs/logger.go");
        assert!(!seen.iter().any(|p| p.as_str().contains("out/logs")));
    }

    #[tokio::test]
    async fn test_watcher_shutdown_closes_stream() {
        let (_temp, _root, tree) = temp_tree();
        let watcher = FileWatcher::start(tree, AcceptAllFilter, WatchOptions::default())
            .await
            .expect("Failed to start watcher");

        assert!(watcher.shutdown().await.is_ok());
    }
}
