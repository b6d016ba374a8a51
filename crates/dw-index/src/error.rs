//! Error types for the dw-index crate.
//!
//! This module provides the [`IndexError`] type for errors that can occur
//! while extracting, storing and materializing documentation records.

use camino::Utf8PathBuf;
use dw_core::ConfigError;
use dw_go_parser::ParseError;
use dw_watcher::WatchError;

/// Errors that can occur in the indexing pipeline.
///
/// # Error Recovery Strategy
///
/// - **Transient** ([`IndexError::Read`], [`IndexError::Empty`], syntax
///   errors in [`IndexError::Parse`]): the file may be mid-write; retried
/// - **Retries exhausted** ([`IndexError::RetriesExhausted`]): logged, the
///   previous record for the path is kept
/// - **Materialize** ([`IndexError::Materialize`]): logged, the store is not
///   rolled back
/// - **Config / Watch** ([`IndexError::Config`], [`IndexError::Watch`]):
///   fatal at startup
///
/// # Examples
///
/// ```
/// use dw_index::IndexError;
///
/// let err = IndexError::empty("src/a.go");
/// assert!(err.is_transient());
/// assert_eq!(err.to_string(), "file is empty: src/a.go");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Failed to read a source file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The path of the file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source file exists but has no contents yet.
    #[error("file is empty: {path}")]
    Empty {
        /// The empty file.
        path: Utf8PathBuf,
    },

    /// Failed to parse a Go file.
    #[error("failed to parse file {path}: {source}")]
    Parse {
        /// The path of the file that couldn't be parsed.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: ParseError,
    },

    /// Every attempt failed; carries the last error.
    #[error("giving up on {path} after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// The path being extracted.
        path: Utf8PathBuf,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: Box<IndexError>,
    },

    /// Failed to write an index file.
    #[error("failed to write index file {path}: {source}")]
    Materialize {
        /// The index file being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the index.
    #[error("failed to serialize index: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The watcher failed.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl IndexError {
    /// Creates a new [`IndexError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`IndexError::Empty`] error.
    #[inline]
    pub fn empty(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Empty { path: path.into() }
    }

    /// Creates a new [`IndexError::Parse`] error.
    #[inline]
    pub fn parse(path: impl Into<Utf8PathBuf>, source: ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`IndexError::Materialize`] error.
    #[inline]
    pub fn materialize(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Materialize {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if another attempt may succeed.
    ///
    /// A file that is unreadable, empty or syntactically broken may simply
    /// be in the middle of being written.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Read { .. } | Self::Empty { .. } => true,
            Self::Parse { source, .. } => {
                matches!(source, ParseError::Syntax { .. } | ParseError::Parse)
            }
            _ => false,
        }
    }

    /// Returns `true` if the error concerns one file and the pipeline can
    /// continue.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Read { .. }
                | Self::Empty { .. }
                | Self::Parse { .. }
                | Self::RetriesExhausted { .. }
                | Self::Materialize { .. }
                | Self::Serialize(_)
                | Self::Task(_)
        )
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. }
            | Self::Empty { path }
            | Self::Parse { path, .. }
            | Self::RetriesExhausted { path, .. }
            | Self::Materialize { path, .. } => Some(path),
            Self::Serialize(_) | Self::Config(_) | Self::Watch(_) | Self::Task(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_syntax_errors_are_transient() {
        let err = IndexError::parse("a.go", ParseError::Syntax { line: 1, column: 1 });
        assert!(err.is_transient());
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_language_init_is_not_transient() {
        let err = IndexError::parse("a.go", ParseError::LanguageInit);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_retries_exhausted_display() {
        let err = IndexError::RetriesExhausted {
            path: Utf8PathBuf::from("a.go"),
            attempts: 3,
            source: Box::new(IndexError::empty("a.go")),
        };
        assert!(!err.is_transient());
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "giving up on a.go after 3 attempts: file is empty: a.go"
        );
        assert_eq!(err.path().map(|p| p.as_str()), Some("a.go"));
    }

    #[test]
    fn test_read_error() {
        let err = IndexError::read("a.go", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_transient());
        assert!(err.to_string().contains("gone"));
    }
}
