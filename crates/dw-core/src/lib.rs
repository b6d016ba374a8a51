//! Core types, configuration, and errors for docwatch.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - The index record types ([`SourceRecord`], [`FunctionRecord`], [`VariableRecord`])
//! - Configuration structures ([`Config`] and its sections)
//! - [`ConfigError`] for configuration loading and validation failures
//!
//! # Crate Dependencies
//!
//! ```text
//! dw-cli ──► dw-index ──► dw-go-parser ──► dw-core
//!                     └─► dw-watcher ────────────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, DedupPolicy, ExtractConfig, OutputConfig, OutputMode, WatchConfig};
pub use error::ConfigError;
pub use types::{FunctionRecord, SourceRecord, VariableRecord};
