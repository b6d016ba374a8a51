//! Directory traversal for registration and indexing.
//!
//! [`TreeWalker`] uses the `ignore` crate to enumerate the directories to
//! register with the OS watcher and the source files to index. Every
//! directory is visited, including hidden and git-ignored ones; only the
//! directories rejected by a [`SkipDirFilter`] are pruned, with everything
//! below them.
//!
//! Unreadable entries are logged and skipped; one bad entry never aborts the
//! walk.

use camino::{Utf8Path, Utf8PathBuf};
use ignore::{DirEntry, WalkBuilder};

use crate::error::WatchError;
use crate::filter::{FileFilter, SkipDirFilter};

/// Walks a directory tree.
///
/// # Examples
///
/// ```no_run
/// use dw_watcher::{ExtensionFilter, SkipDirFilter, TreeWalker};
/// use camino::Utf8Path;
///
/// let walker = TreeWalker::new(Utf8Path::new("./src"), SkipDirFilter::new([".git"]));
/// for dir in walker.directories() {
///     println!("dir: {dir}");
/// }
/// for file in walker.files(&ExtensionFilter::go()) {
///     println!("source: {file}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: Utf8PathBuf,
    skip: SkipDirFilter,
}

impl TreeWalker {
    /// Creates a walker rooted at `root`.
    #[must_use]
    pub fn new(root: &Utf8Path, skip: SkipDirFilter) -> Self {
        Self {
            root: root.to_owned(),
            skip,
        }
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Every directory in the tree, the root first.
    #[must_use]
    pub fn directories(&self) -> Vec<Utf8PathBuf> {
        self.collect(|entry| entry.file_type().is_some_and(|ft| ft.is_dir()))
    }

    /// Every regular file accepted by `filter`.
    #[must_use]
    pub fn files<F: FileFilter + ?Sized>(&self, filter: &F) -> Vec<Utf8PathBuf> {
        let mut files = self.collect(|entry| entry.file_type().is_some_and(|ft| ft.is_file()));
        files.retain(|path| filter.should_process(path));
        files
    }

    fn collect(&self, keep: impl Fn(&DirEntry) -> bool) -> Vec<Utf8PathBuf> {
        let mut paths = Vec::new();

        for result in self.build_walker() {
            let entry = match result {
                Ok(entry) => entry,
                Err(error) => {
                    let error = WatchError::from(error);
                    tracing::warn!(root = %self.root, error = %error, "Skipping unreadable entry");
                    continue;
                }
            };

            if !keep(&entry) {
                continue;
            }

            match Utf8Path::from_path(entry.path()) {
                Some(path) => paths.push(path.to_owned()),
                None => {
                    let error = WatchError::non_utf8_path(entry.path());
                    tracing::warn!(error = %error, "Skipping entry");
                }
            }
        }

        paths
    }

    fn build_walker(&self) -> ignore::Walk {
        let skip = self.skip.clone();
        WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_path(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                Utf8Path::from_path(entry.path()).is_none_or(|dir| !skip.skips_dir(dir))
            })
            .build()
    }
}
