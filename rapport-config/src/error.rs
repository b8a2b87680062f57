//! Error types for configuration lookup and value parsing

use std::path::PathBuf;
use thiserror::Error;

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found error.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Figment parsing error.
    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),

    /// A key was present but its value could not be interpreted.
    #[error("Invalid value '{value}' for '{key}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// I/O error.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, expected: &'static str) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_names_key_and_expectation() {
        let err = ConfigError::invalid("use-console", "maybe", "a boolean");
        assert_eq!(
            err.to_string(),
            "Invalid value 'maybe' for 'use-console': expected a boolean"
        );
    }

    #[test]
    fn file_not_found_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("missing.yaml"));
        assert_eq!(err.to_string(), "Configuration file not found: missing.yaml");
    }
}
