//! Error types for the dw-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while registering directories, receiving notifications and writing the
//! accepted-event log.

use camino::Utf8PathBuf;

/// Errors that can occur during file watching operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal during start, logged
///   and skipped once the watcher is running
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - root must exist
/// - **Not a directory** ([`WatchError::NotADirectory`]): Fatal - root must be a directory
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - communication broken
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **Walk errors** ([`WatchError::Walk`]): Recoverable - skip the entry
/// - **Event log** ([`WatchError::EventLog`]): Fatal - the log must be writable
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use dw_watcher::WatchError;
///
/// fn handle_watch_error(err: &WatchError) {
///     if err.is_fatal() {
///         eprintln!("Fatal watcher error: {err}");
///     } else {
///         eprintln!("Warning: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize the OS watcher or register a directory.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The specified root exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// Directory traversal failed for one entry.
    #[error("directory walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// The accepted-event log could not be opened or written.
    #[error("event log {path}: {source}")]
    EventLog {
        /// The log file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Creates a new [`WatchError::EventLog`] error.
    #[inline]
    pub fn event_log(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::EventLog {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    ///
    /// Recoverable errors concern a single path or entry and don't prevent
    /// watching other files.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_) | Self::Walk(_))
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path)
            | Self::NotADirectory(path)
            | Self::EventLog { path, .. } => Some(path),
            Self::Notify(_)
            | Self::ChannelClosed
            | Self::NonUtf8Path(_)
            | Self::Walk(_)
            | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_watch_error_path_not_found() {
        let err = WatchError::path_not_found("src/missing");
        assert!(err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("src/missing"));
        assert_eq!(err.to_string(), "path does not exist: src/missing");
    }

    #[test]
    fn test_watch_error_non_utf8_is_recoverable() {
        let err = WatchError::non_utf8_path(PathBuf::from("test"));
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_watch_error_event_log() {
        let err = WatchError::event_log(
            "logs/file_watcher_logs_2024-01-01.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        );
        assert!(err.is_fatal());
        assert_eq!(
            err.path().map(|p| p.as_str()),
            Some("logs/file_watcher_logs_2024-01-01.txt")
        );
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_watch_error_channel_closed() {
        let err = WatchError::ChannelClosed;
        assert!(err.is_fatal());
        assert!(err.path().is_none());
    }
}
