//! In-memory document store.
//!
//! Maps each indexed path to its latest [`SourceRecord`]. Keys are kept in a
//! [`BTreeMap`] so the materialized index is sorted without an extra pass.
//!
//! # Ordering
//!
//! Extractions for one path may finish out of order when an earlier one was
//! slowed down by retries. Each accepted event carries a sequence number and
//! [`DocumentStore::put_ordered`] refuses results older than the latest one
//! applied for that path:
//!
//! ```text
//! accept #1 ──────── retry ── retry ────────── done (dropped: stale)
//! accept #2 ── done (applied)
//! ```

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use dw_core::SourceRecord;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<Utf8PathBuf, SourceRecord>,
    applied: FxHashMap<Utf8PathBuf, u64>,
}

/// Thread-safe map from source path to record.
///
/// A record is only ever replaced whole. A failed extraction never touches
/// the store, so the previous record for the path stays in place.
///
/// # Examples
///
/// ```
/// use dw_core::SourceRecord;
/// use dw_index::DocumentStore;
/// use camino::Utf8Path;
///
/// let store = DocumentStore::new();
/// assert!(store.put_ordered(Utf8Path::new("a.go"), 2, SourceRecord::new("new")));
/// assert!(!store.put_ordered(Utf8Path::new("a.go"), 1, SourceRecord::new("old")));
///
/// let record = store.get(Utf8Path::new("a.go")).unwrap();
/// assert_eq!(record.package, "new");
/// ```
#[derive(Debug, Default)]
pub struct DocumentStore {
    inner: Mutex<Inner>,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for `path`.
    pub fn put(&self, path: &Utf8Path, record: SourceRecord) {
        self.inner.lock().records.insert(path.to_owned(), record);
    }

    /// Inserts the record unless a result with a higher sequence number was
    /// already applied for `path`.
    ///
    /// Returns `false` if the record was stale and dropped.
    pub fn put_ordered(&self, path: &Utf8Path, seq: u64, record: SourceRecord) -> bool {
        let mut inner = self.inner.lock();
        match inner.applied.get(path) {
            Some(&latest) if latest > seq => return false,
            _ => {}
        }
        inner.applied.insert(path.to_owned(), seq);
        inner.records.insert(path.to_owned(), record);
        true
    }

    /// Returns a copy of the record for `path`.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<SourceRecord> {
        self.inner.lock().records.get(path).cloned()
    }

    /// Number of indexed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Returns `true` if nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Indexed paths in sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.inner.lock().records.keys().cloned().collect()
    }

    /// A sorted copy of every record.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<Utf8PathBuf, SourceRecord> {
        self.inner.lock().records.clone()
    }

    /// Runs `f` on the records while holding the store lock.
    ///
    /// Used to write the index without copying it, and so that two writers
    /// never interleave.
    pub fn with_records<T>(&self, f: impl FnOnce(&BTreeMap<Utf8PathBuf, SourceRecord>) -> T) -> T {
        f(&self.inner.lock().records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_put_replaces_wholesale() {
        let store = DocumentStore::new();
        let path = Utf8Path::new("src/a.go");

        let mut first = SourceRecord::new("a");
        first.imports.push("fmt".to_owned());
        store.put(path, first);
        store.put(path, SourceRecord::new("a"));

        let record = store.get(path).expect("record");
        assert!(record.imports.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_ordered_drops_stale_results() {
        let store = DocumentStore::new();
        let path = Utf8Path::new("a.go");

        assert!(store.put_ordered(path, 1, SourceRecord::new("v1")));
        assert!(store.put_ordered(path, 3, SourceRecord::new("v3")));
        assert!(!store.put_ordered(path, 2, SourceRecord::new("v2")));
        assert_eq!(store.get(path).map(|r| r.package), Some("v3".to_owned()));

        // Sequence numbers are tracked per path
        assert!(store.put_ordered(Utf8Path::new("b.go"), 1, SourceRecord::new("b")));
    }

    #[test]
    fn test_paths_are_sorted() {
        let store = DocumentStore::new();
        for name in ["z.go", "a.go", "m/b.go"] {
            store.put(Utf8Path::new(name), SourceRecord::new("p"));
        }
        let paths: Vec<_> = store.paths().iter().map(|p| p.to_string()).collect();
        assert_eq!(paths, ["a.go", "m/b.go", "z.go"]);
        assert_eq!(store.snapshot().len(), 3);
    }

    #[test]
    fn test_concurrent_puts() {
        let store = Arc::new(DocumentStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let path = Utf8PathBuf::from(format!("f{i}.go"));
                    store.put(&path, SourceRecord::new("p"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread");
        }
        assert_eq!(store.len(), 8);
        assert!(!store.is_empty());
    }
}
