//! Directory watching for docwatch.
//!
//! This crate turns OS file notifications into a filtered stream of
//! [`ChangeEvent`]s for the indexing pipeline:
//!
//! - Register the root and every subdirectory, and directories created later
//! - Map `notify` events onto [`Operation`]s
//! - Filter events to source files outside skipped directories
//! - Suppress duplicate notifications ([`EventGate`])
//! - Record accepted events in a daily log file ([`EventLog`])
//!
//! # Crate Dependencies
//!
//! ```text
//! dw-cli ──► dw-index ──► dw-go-parser ──► dw-core
//!                     └─► dw-watcher ────────────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use dw_core::WatchConfig;
//! use dw_watcher::{
//!     EventGate, EventLog, ExtensionFilter, FileWatcher, WatchMessage, WatchOptions, WatchedTree,
//! };
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), dw_watcher::WatchError> {
//! let config = WatchConfig::default();
//! let tree = WatchedTree::new(Utf8Path::new("./src"))?;
//! let mut watcher =
//!     FileWatcher::start(tree, ExtensionFilter::go(), WatchOptions::from_config(&config)).await?;
//! let mut gate = EventGate::from_config(&config);
//! let mut log = EventLog::open_today(Utf8Path::new("logs"))?;
//!
//! while let Some(message) = watcher.recv().await {
//!     match message {
//!         WatchMessage::Event(event) => {
//!             if let Some(admission) = gate.accept(&event) {
//!                 log.record(&event)?;
//!                 tokio::time::sleep(admission.delay()).await;
//!                 admission.settle();
//!                 // extract event.path
//!             }
//!         }
//!         WatchMessage::Error(error) => eprintln!("watch error: {error}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! ```
//! use dw_watcher::WatchError;
//!
//! fn handle_watch_error(err: &WatchError) {
//!     if err.is_fatal() {
//!         eprintln!("Fatal watcher error: {err}");
//!     } else {
//!         eprintln!("Warning: {err}");
//!     }
//! }
//! ```
//!
//! # Performance Considerations
//!
//! - **Filtering at Source**: Events are filtered on the watcher thread
//!   before being sent to the channel.
//! - **Bounded Channel**: The event channel holds 100 messages by default;
//!   a slow consumer applies backpressure to the watcher thread, not the OS.
//! - **UTF-8 Paths**: Paths are validated as UTF-8 once, on the watcher
//!   thread; non-UTF-8 paths are logged and skipped.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod dedup;
pub mod error;
pub mod events;
pub mod filter;
pub mod log;
pub mod tree;
pub mod walker;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{ChangeEvent, Operation, WatchMessage};

// Re-export filter types
pub use filter::{AcceptAllFilter, ExtensionFilter, FileFilter, SkipDirFilter};

// Re-export dedup types
pub use dedup::{
    Admission, DebounceKey, DebounceTicket, DedupKey, EventGate, ImmediateDedup, WindowedDebounce,
};

// Re-export the rest
pub use log::EventLog;
pub use tree::WatchedTree;
pub use walker::TreeWalker;
pub use watcher::{FileWatcher, WatchOptions};
