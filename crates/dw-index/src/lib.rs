//! Incremental documentation index for Go source trees.
//!
//! This crate ties the watcher and the parser together:
//!
//! - [`Extractor`] - Reads and parses one file, retrying while it looks
//!   half-written ([`RetryPolicy`], [`Clock`])
//! - [`DocumentStore`] - Latest [`SourceRecord`](dw_core::SourceRecord) per
//!   path, applied in acceptance order
//! - [`Materializer`] - Writes the store as one aggregate JSON file or as a
//!   mirror tree of per-file JSON files
//! - [`InitialPass`] - Parallel full index before watching starts
//! - [`WatchLoop`] - The event loop driving all of the above
//! - [`PipelineStats`] - Counters reported at shutdown
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
//! use dw_core::Config;
//! use dw_index::WatchLoop;
//! use camino::Utf8Path;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), dw_index::IndexError> {
//! let cancel = CancellationToken::new();
//! let summary = WatchLoop::new(Config::default(), Utf8Path::new("."))?
//!     .run(cancel)
//!     .await?;
//! println!("indexed {} files", summary.indexed_files);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! ```
//! use dw_index::IndexError;
//!
//! fn report(err: &IndexError) {
//!     if err.is_recoverable() {
//!         eprintln!("Skipping: {err}");
//!     } else {
//!         eprintln!("Fatal: {err}");
//!     }
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod extractor;
mod initial;
mod materialize;
mod pipeline;
mod retry;
mod stats;
mod store;

pub use error::IndexError;
pub use extractor::{Extractor, extract_once};
pub use initial::{InitialPass, InitialReport};
pub use materialize::Materializer;
pub use pipeline::{RunSummary, WatchLoop};
pub use retry::{Clock, RetryPolicy, SystemClock};
pub use stats::{PipelineStats, StatsSnapshot};
pub use store::DocumentStore;
