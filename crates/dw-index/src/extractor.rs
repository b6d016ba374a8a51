//! Single-file extraction with retries.
//!
//! [`Extractor`] reads a Go file, parses it and returns its
//! [`SourceRecord`]. It is called from blocking tasks; each thread keeps its
//! own [`GoParser`] so concurrent extractions never share one.

use std::cell::RefCell;
use std::sync::Arc;

use camino::Utf8Path;
use dw_core::{ExtractConfig, SourceRecord};
use dw_go_parser::GoParser;

use crate::error::IndexError;
use crate::retry::{Clock, RetryPolicy, SystemClock};

thread_local! {
    static PARSER: RefCell<Option<GoParser>> = const { RefCell::new(None) };
}

/// Reads and parses source files, retrying while they look half-written.
///
/// # Examples
///
/// ```no_run
/// use dw_core::ExtractConfig;
/// use dw_index::Extractor;
/// use camino::Utf8Path;
///
/// let extractor = Extractor::new(&ExtractConfig::default());
/// let record = extractor.extract(Utf8Path::new("src/math.go"))?;
/// println!("package {}", record.package);
/// # Ok::<(), dw_index::IndexError>(())
/// ```
#[derive(Clone)]
pub struct Extractor {
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Creates an extractor that sleeps on the system clock.
    #[must_use]
    pub fn new(config: &ExtractConfig) -> Self {
        Self::with_clock(RetryPolicy::from_config(config), Arc::new(SystemClock))
    }

    /// Creates an extractor with an explicit policy and clock.
    #[must_use]
    pub fn with_clock(policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    /// Extracts `path`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::RetriesExhausted`] when every attempt failed
    /// transiently, or the first permanent error.
    pub fn extract(&self, path: &Utf8Path) -> Result<SourceRecord, IndexError> {
        self.policy
            .run(self.clock.as_ref(), path.to_owned(), |attempt| {
                tracing::trace!(path = %path, attempt, "Extracting");
                extract_once(path)
            })
    }
}

/// Reads and parses `path` once, on this thread's parser.
///
/// # Errors
///
/// Returns [`IndexError::Read`] if the file cannot be read,
/// [`IndexError::Empty`] if it has no contents, or [`IndexError::Parse`] if
/// it does not parse.
pub fn extract_once(path: &Utf8Path) -> Result<SourceRecord, IndexError> {
    PARSER.with(|cell| {
        // Taken out while parsing and put back afterwards
        let mut parser = match cell.borrow_mut().take() {
            Some(parser) => parser,
            None => GoParser::new().map_err(|e| IndexError::parse(path, e))?,
        };
        let result = extract_with(&mut parser, path);
        *cell.borrow_mut() = Some(parser);
        result
    })
}

/// Parses `path` with a caller-owned parser, without retries.
///
/// Used by the initial pass, where each rayon worker owns its parser.
pub(crate) fn extract_with(
    parser: &mut GoParser,
    path: &Utf8Path,
) -> Result<SourceRecord, IndexError> {
    let source = std::fs::read_to_string(path).map_err(|e| IndexError::read(path, e))?;
    if source.trim().is_empty() {
        return Err(IndexError::empty(path));
    }
    parser
        .parse(&source)
        .map(|parsed| parsed.record)
        .map_err(|e| IndexError::parse(path, e))
}
