//! The watched directory tree.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashSet;

use crate::error::WatchError;

/// The root being watched and the directories registered below it.
///
/// Paths reported by the OS are canonical. [`WatchedTree::display_path`]
/// maps them back under the root as the user gave it, which is the form
/// used for index keys and the event log.
///
/// # Examples
///
/// ```no_run
/// use dw_watcher::WatchedTree;
/// use camino::Utf8Path;
///
/// let tree = WatchedTree::new(Utf8Path::new("./src"))?;
/// let canonical = tree.canonical_root().join("pkg/a.go");
/// assert_eq!(tree.display_path(&canonical), Utf8Path::new("./src/pkg/a.go"));
/// # Ok::<(), dw_watcher::WatchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WatchedTree {
    display_root: Utf8PathBuf,
    canonical_root: Utf8PathBuf,
    registered: FxHashSet<Utf8PathBuf>,
}

impl WatchedTree {
    /// Resolves `root`, which must be an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`], [`WatchError::NotADirectory`] or
    /// [`WatchError::Io`] if the root cannot be canonicalized.
    pub fn new(root: &Utf8Path) -> Result<Self, WatchError> {
        if !root.exists() {
            return Err(WatchError::path_not_found(root));
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root.to_owned()));
        }

        let canonical_root = root.canonicalize_utf8()?;

        Ok(Self {
            display_root: root.to_owned(),
            canonical_root,
            registered: FxHashSet::default(),
        })
    }

    /// The root as given by the user.
    #[inline]
    #[must_use]
    pub fn display_root(&self) -> &Utf8Path {
        &self.display_root
    }

    /// The canonical absolute root.
    #[inline]
    #[must_use]
    pub fn canonical_root(&self) -> &Utf8Path {
        &self.canonical_root
    }

    /// Path of `path` relative to the root, accepting either form.
    #[must_use]
    pub fn relative<'a>(&self, path: &'a Utf8Path) -> Option<&'a Utf8Path> {
        path.strip_prefix(&self.canonical_root)
            .or_else(|_| path.strip_prefix(&self.display_root))
            .ok()
    }

    /// Maps a path under the root to its display form.
    ///
    /// Paths outside the root are returned unchanged.
    #[must_use]
    pub fn display_path(&self, path: &Utf8Path) -> Utf8PathBuf {
        match path.strip_prefix(&self.canonical_root) {
            Ok(rel) if rel.as_str().is_empty() => self.display_root.clone(),
            Ok(rel) => self.display_root.join(rel),
            Err(_) => path.to_owned(),
        }
    }

    /// Records a registered directory. Returns `false` if already present.
    pub fn register(&mut self, dir: Utf8PathBuf) -> bool {
        self.registered.insert(dir)
    }

    /// Forgets a directory that was removed or renamed away.
    ///
    /// Returns `false` if it was not registered.
    pub fn forget(&mut self, dir: &Utf8Path) -> bool {
        self.registered.remove(dir)
    }

    /// Returns `true` if `dir` has been registered.
    #[must_use]
    pub fn is_registered(&self, dir: &Utf8Path) -> bool {
        self.registered.contains(dir)
    }

    /// Number of registered directories.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8 temp path");
        (temp, root)
    }

    #[test]
    fn test_missing_root() {
        let err = WatchedTree::new(Utf8Path::new("/nonexistent/docwatch")).unwrap_err();
        assert!(matches!(err, WatchError::PathNotFound(_)));
    }

    #[test]
    fn test_file_root_is_rejected() {
        let (_temp, root) = temp_root();
        let file = root.join("a.go");
        fs::write(&file, "package a\n").expect("write");
        let err = WatchedTree::new(&file).unwrap_err();
        assert!(matches!(err, WatchError::NotADirectory(_)));
    }

    #[test]
    fn test_display_path_round_trip() {
        let (_temp, root) = temp_root();
        let tree = WatchedTree::new(&root).expect("tree");

        let canonical = tree.canonical_root().join("pkg/a.go");
        let display = tree.display_path(&canonical);
        assert_eq!(display, root.join("pkg/a.go"));
        assert_eq!(tree.relative(&display), Some(Utf8Path::new("pkg/a.go")));
        assert_eq!(tree.relative(&canonical), Some(Utf8Path::new("pkg/a.go")));
        assert_eq!(tree.display_path(tree.canonical_root()), root);
    }

    #[test]
    fn test_path_outside_root_is_unchanged() {
        let (_temp, root) = temp_root();
        let tree = WatchedTree::new(&root).expect("tree");
        let outside = Utf8Path::new("/elsewhere/b.go");
        assert_eq!(tree.display_path(outside), outside);
        assert!(tree.relative(outside).is_none());
    }

    #[test]
    fn test_register_is_idempotent() {
        let (_temp, root) = temp_root();
        let mut tree = WatchedTree::new(&root).expect("tree");
        assert!(tree.register(root.join("pkg")));
        assert!(!tree.register(root.join("pkg")));
        assert!(tree.is_registered(&root.join("pkg")));
        assert_eq!(tree.registered_count(), 1);

        assert!(tree.forget(&root.join("pkg")));
        assert!(!tree.is_registered(&root.join("pkg")));
        assert!(tree.register(root.join("pkg")));
    }
}
