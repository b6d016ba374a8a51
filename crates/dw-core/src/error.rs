//! Error types for the dw-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration-related errors
//! that can occur across the workspace.

/// Errors that can occur during configuration loading and validation.
///
/// Every variant is fatal at startup: the watcher never enters its event loop
/// with a configuration it could not load or validate.
///
/// # Examples
///
/// ```
/// use dw_core::ConfigError;
///
/// let error = ConfigError::invalid_option("watch.debounce_ms", "must be positive");
/// assert!(error.to_string().contains("watch.debounce_ms"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("extract.max_attempts", "must be at least 1");
        let msg = error.to_string();
        assert!(msg.contains("extract.max_attempts"));
        assert!(msg.contains("must be at least 1"));
    }

    #[test]
    fn test_parse_error_from_json() {
        let source = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let error = ConfigError::from(source);
        assert!(matches!(error, ConfigError::Parse(_)));
        assert!(error.to_string().starts_with("failed to parse configuration"));
    }
}
