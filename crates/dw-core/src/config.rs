//! Configuration structures for docwatch.
//!
//! This module provides configuration types for all components of the pipeline:
//!
//! - [`WatchConfig`] - File watcher settings (dedup policy, debounce window)
//! - [`ExtractConfig`] - Extraction settings (retry bound, source extensions)
//! - [`OutputConfig`] - Where the index and the event log are written
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the keys it changes.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How repeated notifications for the same file are suppressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Reject an event identical to the immediately preceding accepted one,
    /// then forget it so the next identical event counts as new.
    Immediate,
    /// Accept the first event for a file, extract after the quiescence window,
    /// and drop identical events seen while the extraction is pending.
    #[default]
    Windowed,
}

/// Shape of the materialized index on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One aggregate JSON file holding every indexed path.
    #[default]
    Aggregate,
    /// One JSON file per source file under a directory mirroring the watched tree.
    Mirror,
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use dw_core::{DedupPolicy, WatchConfig};
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert_eq!(config.dedup, DedupPolicy::Windowed);
/// assert!(config.register_new_dirs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiescence window in milliseconds for the windowed policy.
    pub debounce_ms: u64,

    /// Duplicate-suppression policy.
    pub dedup: DedupPolicy,

    /// Whether directories created after startup are registered.
    pub register_new_dirs: bool,

    /// Capacity of the channel between the watcher thread and the event loop.
    pub channel_capacity: usize,

    /// Directory names never registered or indexed, at any depth.
    ///
    /// The index and log directories are always skipped by location and
    /// need not be listed.
    pub skip_dirs: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            dedup: DedupPolicy::Windowed,
            register_new_dirs: true,
            channel_capacity: 100,
            skip_dirs: vec![".git".to_owned()],
        }
    }
}

impl WatchConfig {
    /// Returns the debounce window as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration for source extraction.
///
/// # Examples
///
/// ```
/// use dw_core::ExtractConfig;
///
/// let config = ExtractConfig::default();
/// assert_eq!(config.max_attempts, 3);
/// assert_eq!(config.retry_delay_ms, 50);
/// assert_eq!(config.extensions, vec!["go"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Maximum parse attempts per extraction (including the first).
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,

    /// Source file extensions to index, without the leading dot.
    pub extensions: Vec<String>,

    /// Whether the whole tree is indexed once before watching starts.
    pub initial_index: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 50,
            extensions: vec!["go".to_owned()],
            initial_index: true,
        }
    }
}

impl ExtractConfig {
    /// Returns the delay between attempts as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Configuration for everything the pipeline writes to disk.
///
/// All paths are resolved against [`base_dir`](Self::base_dir), which
/// defaults to the working directory.
///
/// # Examples
///
/// ```
/// use dw_core::{OutputConfig, OutputMode};
///
/// let config = OutputConfig::default();
/// assert_eq!(config.mode, OutputMode::Aggregate);
/// assert_eq!(config.aggregate_path().as_str(), "./reference.json");
/// assert_eq!(config.mirror_root().as_str(), "./references");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Aggregate file or per-file mirror.
    pub mode: OutputMode,

    /// Base directory for the index and the event log.
    pub base_dir: Utf8PathBuf,

    /// File name of the aggregate index.
    pub aggregate_file: String,

    /// Directory name of the mirror tree.
    pub mirror_dir: String,

    /// Directory name of the event log.
    pub log_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::Aggregate,
            base_dir: Utf8PathBuf::from("."),
            aggregate_file: "reference.json".to_owned(),
            mirror_dir: "references".to_owned(),
            log_dir: "logs".to_owned(),
        }
    }
}

impl OutputConfig {
    /// Path of the aggregate index file.
    #[must_use]
    pub fn aggregate_path(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.aggregate_file)
    }

    /// Root directory of the mirror tree.
    #[must_use]
    pub fn mirror_root(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.mirror_dir)
    }

    /// Directory holding the date-stamped event logs.
    #[must_use]
    pub fn log_root(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.log_dir)
    }
}

/// Root configuration for docwatch.
///
/// # Examples
///
/// ```
/// use dw_core::Config;
///
/// let config = Config::default();
/// assert!(config.validate().is_ok());
///
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// let parsed: Config = serde_json::from_str(&json).unwrap();
/// assert_eq!(config, parsed);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Extraction configuration.
    pub extract: ExtractConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing keys take their default values.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Checks that every option has a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extract.max_attempts == 0 {
            return Err(ConfigError::invalid_option(
                "extract.max_attempts",
                "must be at least 1",
            ));
        }
        if self.extract.extensions.is_empty() {
            return Err(ConfigError::invalid_option(
                "extract.extensions",
                "at least one extension is required",
            ));
        }
        if self.watch.dedup == DedupPolicy::Windowed && self.watch.debounce_ms == 0 {
            return Err(ConfigError::invalid_option(
                "watch.debounce_ms",
                "the windowed policy needs a non-zero window",
            ));
        }
        if self.watch.channel_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "watch.channel_capacity",
                "must be at least 1",
            ));
        }
        for (option, value) in [
            ("output.aggregate_file", &self.output.aggregate_file),
            ("output.mirror_dir", &self.output.mirror_dir),
            ("output.log_dir", &self.output.log_dir),
        ] {
            if value.is_empty() {
                return Err(ConfigError::invalid_option(option, "must not be empty"));
            }
        }
        Ok(())
    }
}
