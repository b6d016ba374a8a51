//! File filtering for watch events.
//!
//! Filters run on the watcher thread before an event is sent to the channel,
//! so the watch loop only sees paths it may index.
//!
//! # Examples
//!
//! ```
//! use dw_watcher::{ExtensionFilter, FileFilter, SkipDirFilter};
//! use camino::Utf8Path;
//!
//! let sources = ExtensionFilter::go();
//! let skip = SkipDirFilter::new([".git"]);
//!
//! assert!(sources.should_process(Utf8Path::new("src/math.go")));
//! assert!(!sources.should_process(Utf8Path::new("src/README.md")));
//! assert!(!skip.should_process(Utf8Path::new(".git/hooks/pre-commit")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use smallvec::SmallVec;

/// A filter for determining which file events to process.
///
/// # Thread Safety
///
/// Filters must be [`Send`] and [`Sync`] because they are used from the
/// blocking watcher thread, and `'static` to be moved into it.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at the given path should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts all files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// A filter based on file extensions.
///
/// # Examples
///
/// ```
/// use dw_watcher::{FileFilter, ExtensionFilter};
/// use camino::Utf8Path;
///
/// let filter = ExtensionFilter::new(&["go"]);
/// assert!(filter.should_process(Utf8Path::new("pkg/server.go")));
/// assert!(!filter.should_process(Utf8Path::new("pkg/server.go.swp")));
/// assert!(!filter.should_process(Utf8Path::new("Makefile")));
/// ```
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: SmallVec<[String; 4]>,
}

impl ExtensionFilter {
    /// Creates a new extension filter.
    ///
    /// Extensions are given without the leading dot.
    #[must_use]
    pub fn new(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Creates an extension filter from owned strings.
    #[must_use]
    pub fn from_owned(extensions: Vec<String>) -> Self {
        Self {
            extensions: extensions.into_iter().collect(),
        }
    }

    /// Filter accepting only `.go` files.
    #[must_use]
    pub fn go() -> Self {
        Self::new(&["go"])
    }
}

impl FileFilter for ExtensionFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Directories that are never registered or indexed.
///
/// A directory is skipped when its name is in the name list (`.git`) or when
/// it lies under one of the excluded locations, such as the directories the
/// tool writes its own output to. Excluded locations are absolute canonical
/// paths, so a user package that merely shares a name with them is kept.
///
/// # Examples
///
/// ```
/// use dw_watcher::{FileFilter, SkipDirFilter};
/// use camino::Utf8Path;
///
/// let skip = SkipDirFilter::new([".git"]).with_excluded("/work/out/logs");
///
/// assert!(skip.excludes(Utf8Path::new("/work/out/logs/today.txt")));
/// assert!(!skip.excludes(Utf8Path::new("/work/src/internal/logs/logger.go")));
/// assert!(!skip.should_process(Utf8Path::new(".git/HEAD")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SkipDirFilter {
    dirs: SmallVec<[String; 4]>,
    excluded: SmallVec<[Utf8PathBuf; 2]>,
}

impl SkipDirFilter {
    /// Creates a filter skipping the given directory names.
    #[must_use]
    pub fn new<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
            excluded: SmallVec::new(),
        }
    }

    /// Also skips everything under the absolute path `dir`.
    #[must_use]
    pub fn with_excluded(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    /// Returns `true` if `name` is one of the skipped directory names.
    #[must_use]
    pub fn is_skipped(&self, name: &str) -> bool {
        self.dirs.iter().any(|d| d == name)
    }

    /// Returns `true` if the absolute `path` lies under an excluded location.
    #[must_use]
    pub fn excludes(&self, path: &Utf8Path) -> bool {
        self.excluded.iter().any(|dir| path.starts_with(dir))
    }

    /// Returns `true` if the directory at `path` must not be visited.
    ///
    /// `path` may be relative or contain symlinks; it is canonicalized before
    /// the location check when the literal form does not match.
    #[must_use]
    pub fn skips_dir(&self, path: &Utf8Path) -> bool {
        if path.file_name().is_some_and(|name| self.is_skipped(name)) {
            return true;
        }
        if self.excluded.is_empty() {
            return false;
        }
        self.excludes(path)
            || path
                .canonicalize_utf8()
                .is_ok_and(|canonical| self.excludes(&canonical))
    }
}

impl FileFilter for SkipDirFilter {
    /// Checks the components of a path relative to the watched root.
    fn should_process(&self, path: &Utf8Path) -> bool {
        !path
            .components()
            .any(|component| self.is_skipped(component.as_str()))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}
