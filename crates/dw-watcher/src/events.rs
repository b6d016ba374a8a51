//! Event types for file change notifications.
//!
//! # Event Flow
//!
//! ```text
//! notify::Event (one or more paths, EventKind)
//!        │
//!        ▼  Operation::from_kind + path filter
//!   ChangeEvent (one path, one operation, wall-clock time)
//!        │
//!        ▼
//!   WatchMessage::Event sent to the watch loop
//! ```

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// The kind of change reported for a path.
///
/// Displayed in upper case, which is the form written to the event log.
///
/// # Examples
///
/// ```
/// use dw_watcher::Operation;
///
/// assert_eq!(Operation::Write.to_string(), "WRITE");
/// assert!(Operation::Create.is_content_change());
/// assert!(!Operation::Chmod.is_content_change());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// A file or directory appeared (including the target of a rename).
    Create,
    /// File contents changed.
    Write,
    /// A file or directory was deleted.
    Remove,
    /// A file or directory was renamed away.
    Rename,
    /// Permissions or other metadata changed.
    Chmod,
}

impl Operation {
    /// Maps a `notify` event kind onto an operation.
    ///
    /// Returns `None` for kinds that carry no change (access events) and for
    /// the combined rename notification, whose halves arrive separately.
    #[must_use]
    pub const fn from_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Self::Create),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => Some(Self::Chmod),
            EventKind::Modify(_) | EventKind::Any => Some(Self::Write),
            EventKind::Remove(_) => Some(Self::Remove),
            EventKind::Access(_) | EventKind::Other => None,
        }
    }

    /// Returns `true` if the operation means the file's contents may differ.
    #[inline]
    #[must_use]
    pub const fn is_content_change(self) -> bool {
        matches!(self, Self::Create | Self::Write)
    }

    /// Upper-case name as written to the event log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Write => "WRITE",
            Self::Remove => "REMOVE",
            Self::Rename => "RENAME",
            Self::Chmod => "CHMOD",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change notification for one path.
///
/// The path is the display path: the watched root as given by the user
/// joined with the path relative to it.
///
/// # Examples
///
/// ```
/// use dw_watcher::{ChangeEvent, Operation};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::new(Utf8PathBuf::from("src/math.go"), Operation::Write);
/// assert_eq!(event.extension(), Some("go"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The path of the file that changed.
    pub path: Utf8PathBuf,

    /// What happened to it.
    pub operation: Operation,

    /// Wall-clock time the watcher observed the change.
    pub observed_at: DateTime<Local>,
}

impl ChangeEvent {
    /// Creates an event observed now.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, operation: Operation) -> Self {
        Self::with_time(path, operation, Local::now())
    }

    /// Creates an event with a specific observation time.
    ///
    /// Useful for testing or when reconstructing events.
    #[inline]
    #[must_use]
    pub const fn with_time(
        path: Utf8PathBuf,
        operation: Operation,
        observed_at: DateTime<Local>,
    ) -> Self {
        Self {
            path,
            operation,
            observed_at,
        }
    }

    /// Observation time truncated to whole seconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub fn observed_second(&self) -> i64 {
        self.observed_at.timestamp()
    }

    /// Returns the file extension, if any.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Returns the path as a [`Utf8Path`].
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// A message from the watcher thread to the watch loop.
#[derive(Debug)]
pub enum WatchMessage {
    /// A filtered change notification.
    Event(ChangeEvent),
    /// A non-fatal error reported by the OS watcher.
    Error(WatchError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    #[test]
    fn test_operation_from_kind() {
        let cases = [
            (EventKind::Create(CreateKind::File), Some(Operation::Create)),
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                Some(Operation::Write),
            ),
            (EventKind::Modify(ModifyKind::Any), Some(Operation::Write)),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                Some(Operation::Create),
            ),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                Some(Operation::Rename),
            ),
            (EventKind::Modify(ModifyKind::Name(RenameMode::Both)), None),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                Some(Operation::Chmod),
            ),
            (EventKind::Remove(RemoveKind::File), Some(Operation::Remove)),
            (EventKind::Access(AccessKind::Any), None),
        ];

        for (kind, expected) in cases {
            assert_eq!(Operation::from_kind(&kind), expected, "{kind:?}");
        }
    }

    #[test]
    fn test_operation_display() {
        let names: Vec<_> = [
            Operation::Create,
            Operation::Write,
            Operation::Remove,
            Operation::Rename,
            Operation::Chmod,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(names, ["CREATE", "WRITE", "REMOVE", "RENAME", "CHMOD"]);
    }

    #[test]
    fn test_observed_second_truncates() {
        let at = Local
            .timestamp_opt(1_700_000_000, 999_000_000)
            .single()
            .expect("valid timestamp");
        let event = ChangeEvent::with_time(Utf8PathBuf::from("a.go"), Operation::Write, at);
        assert_eq!(event.observed_second(), 1_700_000_000);
    }
}
