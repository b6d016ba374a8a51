//! Writing the index to disk.
//!
//! Two layouts are supported, selected by [`OutputMode`]:
//!
//! ```text
//! aggregate                      mirror
//! ─────────                      ──────
//! <base>/reference.json          <base>/references/
//!   { "src/a.go": {...},           a.json         { "src/a.go": {...} }
//!     "src/pkg/b.go": {...} }      pkg/b.json     { "src/pkg/b.go": {...} }
//! ```
//!
//! Every file is written to a sibling `.tmp` file first and then renamed
//! over the target, so readers never observe a half-written index.
//!
//! The store lock is held only while records are serialized. File writes
//! happen afterwards under the materializer's own lock, which keeps writes in
//! the order their snapshots were taken.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use dw_core::{OutputConfig, OutputMode, SourceRecord};
use parking_lot::Mutex;

use crate::error::IndexError;
use crate::store::DocumentStore;

/// A serialized index file waiting to be written.
type Pending = (Utf8PathBuf, Vec<u8>);

/// Serializes the store to the configured layout.
#[derive(Debug)]
pub struct Materializer {
    mode: OutputMode,
    aggregate_path: Utf8PathBuf,
    mirror_root: Utf8PathBuf,
    display_root: Utf8PathBuf,
    write_lock: Mutex<()>,
}

impl Materializer {
    /// Creates a materializer for sources under `display_root`.
    #[must_use]
    pub fn new(config: &OutputConfig, display_root: &Utf8Path) -> Self {
        Self {
            mode: config.mode,
            aggregate_path: config.aggregate_path(),
            mirror_root: config.mirror_root(),
            display_root: display_root.to_owned(),
            write_lock: Mutex::new(()),
        }
    }

    /// The configured layout.
    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Path of the aggregate index file.
    #[must_use]
    pub fn aggregate_path(&self) -> &Utf8Path {
        &self.aggregate_path
    }

    /// Mirror file for the source at `source`.
    ///
    /// The path relative to the watched root is kept and the extension
    /// becomes `.json`.
    #[must_use]
    pub fn mirror_path(&self, source: &Utf8Path) -> Utf8PathBuf {
        let relative = source
            .strip_prefix(&self.display_root)
            .unwrap_or_else(|_| Utf8Path::new(source.as_str().trim_start_matches('/')));
        self.mirror_root.join(relative).with_extension("json")
    }

    /// Replicates the watched directories under the mirror root.
    ///
    /// Does nothing in aggregate mode.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Materialize`] if a directory cannot be created.
    pub fn prepare_mirror(&self, dirs: &[Utf8PathBuf]) -> Result<usize, IndexError> {
        if self.mode != OutputMode::Mirror {
            return Ok(0);
        }

        fs::create_dir_all(&self.mirror_root)
            .map_err(|e| IndexError::materialize(&self.mirror_root, e))?;

        let mut created = 0;
        for dir in dirs {
            let Ok(relative) = dir.strip_prefix(&self.display_root) else {
                continue;
            };
            if relative.as_str().is_empty() {
                continue;
            }
            let target = self.mirror_root.join(relative);
            fs::create_dir_all(&target).map_err(|e| IndexError::materialize(&target, e))?;
            created += 1;
        }

        tracing::debug!(root = %self.mirror_root, directories = created, "Prepared mirror tree");
        Ok(created)
    }

    /// Writes the index.
    ///
    /// In aggregate mode the whole store is written regardless of `changed`.
    /// In mirror mode only the file for `changed` is written, or every file
    /// when `changed` is `None`. Returns the number of files written.
    ///
    /// Concurrent calls never interleave, and the store stays available to
    /// writers while files are on their way to disk.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Serialize`] or [`IndexError::Materialize`]. The
    /// store is left as it was.
    pub fn materialize(
        &self,
        store: &DocumentStore,
        changed: Option<&Utf8Path>,
    ) -> Result<usize, IndexError> {
        let _writing = self.write_lock.lock();
        let pending = store.with_records(|records| self.render(records, changed))?;

        for (path, bytes) in &pending {
            write_file(path, bytes)?;
        }
        Ok(pending.len())
    }

    /// Serializes the files a write covers.
    fn render(
        &self,
        records: &BTreeMap<Utf8PathBuf, SourceRecord>,
        changed: Option<&Utf8Path>,
    ) -> Result<Vec<Pending>, IndexError> {
        match self.mode {
            OutputMode::Aggregate => Ok(vec![(self.aggregate_path.clone(), to_json(records)?)]),
            OutputMode::Mirror => match changed {
                Some(path) => records
                    .get_key_value(path)
                    .map(|(path, record)| self.render_mirror(path, record))
                    .into_iter()
                    .collect(),
                None => records
                    .iter()
                    .map(|(path, record)| self.render_mirror(path, record))
                    .collect(),
            },
        }
    }

    fn render_mirror(&self, path: &Utf8Path, record: &SourceRecord) -> Result<Pending, IndexError> {
        let document: BTreeMap<&Utf8Path, &SourceRecord> = BTreeMap::from([(path, record)]);
        Ok((self.mirror_path(path), to_json(&document)?))
    }
}

/// Pretty-prints `value` with a trailing newline.
fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, IndexError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes `bytes` to `path` through a temporary sibling file.
fn write_file(path: &Utf8Path, bytes: &[u8]) -> Result<(), IndexError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IndexError::materialize(parent, e))?;
    }

    let tmp = Utf8PathBuf::from(format!("{path}.tmp"));
    fs::write(&tmp, bytes).map_err(|e| IndexError::materialize(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| IndexError::materialize(path, e))?;

    tracing::trace!(path = %path, bytes = bytes.len(), "Wrote index file");
    Ok(())
}
