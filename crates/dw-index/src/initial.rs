//! Full index pass run before watching starts.
//!
//! # Architecture
//!
//! ```text
//! TreeWalker::files()  ──►  par_iter().map_init(GoParser)  ──►  DocumentStore
//!   (sorted, skip dirs)        (one parser per rayon thread)       (put)
//! ```
//!
//! Files are parsed once each, without retries: nothing is being edited yet,
//! and a file that fails here is picked up again by its next change event.

use camino::{Utf8Path, Utf8PathBuf};
use dw_go_parser::{GoParser, ParseError};
use dw_watcher::{ExtensionFilter, SkipDirFilter, TreeWalker};
use rayon::prelude::*;

use crate::error::IndexError;
use crate::extractor::extract_with;
use crate::stats::PipelineStats;
use crate::store::DocumentStore;

/// Outcome of an initial pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitialReport {
    /// Source files found under the root.
    pub discovered: usize,
    /// Files stored in the index.
    pub indexed: usize,
    /// Files that could not be read or parsed.
    pub failed: usize,
}

/// Indexes every source file under a root in parallel.
#[derive(Debug, Clone)]
pub struct InitialPass {
    walker: TreeWalker,
    filter: ExtensionFilter,
}

impl InitialPass {
    /// Creates a pass over `root`, skipping `skip` directories and keeping
    /// files accepted by `filter`.
    #[must_use]
    pub fn new(root: &Utf8Path, skip: SkipDirFilter, filter: ExtensionFilter) -> Self {
        Self {
            walker: TreeWalker::new(root, skip),
            filter,
        }
    }

    /// Extracts every file into `store`.
    ///
    /// Failures are logged and counted in `stats`; they never abort the pass.
    pub fn run(&self, store: &DocumentStore, stats: &PipelineStats) -> InitialReport {
        let paths = self.walker.files(&self.filter);
        let results = extract_all(&paths);

        let mut report = InitialReport {
            discovered: paths.len(),
            ..InitialReport::default()
        };
        for (path, result) in results {
            match result {
                Ok(record) => {
                    store.put(&path, record);
                    stats.increment_extracted();
                    report.indexed += 1;
                }
                Err(error) => {
                    tracing::warn!(path = %path, error = %error, "Skipping file in initial index");
                    stats.increment_failed();
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            root = %self.walker.root(),
            discovered = report.discovered,
            indexed = report.indexed,
            failed = report.failed,
            "Initial index complete"
        );
        report
    }
}

fn extract_all(
    paths: &[Utf8PathBuf],
) -> Vec<(Utf8PathBuf, Result<dw_core::SourceRecord, IndexError>)> {
    paths
        .par_iter()
        .map_init(
            || GoParser::new().ok(),
            |parser, path| {
                let result = match parser.as_mut() {
                    Some(parser) => extract_with(parser, path),
                    None => Err(IndexError::parse(path, ParseError::LanguageInit)),
                };
                (path.clone(), result)
            },
        )
        .collect()
}
