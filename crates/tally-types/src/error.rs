//! Error handling for Tally
//!
//! The allocator and the manufacturing split only ever report
//! [`TallyError::InvalidInput`]. The remaining variants belong to the outer
//! surfaces (configuration loading, JSON parsing, file reads) so that callers
//! can propagate a single error type end to end.

use thiserror::Error;

/// Error type for all Tally operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TallyError {
    /// A precondition on the allocation input was violated
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Human readable reason
        message: String,
        /// Offending input field, when one can be named
        field: Option<String>,
        /// Offending split key, when one can be named
        key: Option<String>,
    },

    /// Configuration file or environment override errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human readable reason
        message: String,
        /// Setting that failed validation
        setting: Option<String>,
    },

    /// Malformed JSON or TOML documents
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human readable reason
        message: String,
        /// Document format (`json`, `toml`)
        format: Option<String>,
    },

    /// File and stream failures
    #[error("I/O error: {message}")]
    Io {
        /// Human readable reason
        message: String,
    },
}

/// Result type alias for Tally operations
pub type TallyResult<T> = Result<T, TallyError>;

impl TallyError {
    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Configuration { .. } => "configuration",
            Self::Serialization { .. } => "serialization",
            Self::Io { .. } => "io",
        }
    }

    /// Whether the caller supplied bad data, as opposed to an environment failure
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::Serialization { .. })
    }

    /// Create an input validation error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into(), field: None, key: None }
    }

    /// Create an input validation error naming the offending field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into(), field: Some(field.to_string()), key: None }
    }

    /// Create an input validation error naming the offending split key
    pub fn invalid_key(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into(), field: None, key: Some(key.to_string()) }
    }

    /// Create a configuration error
    pub fn configuration(setting: &str, message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into(), setting: Some(setting.to_string()) }
    }

    /// Create a serialization error
    pub fn serialization(format: &str, message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.to_string()) }
    }
}

impl From<std::io::Error> for TallyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io { message: format!("{err} ({:?})", err.kind()) }
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        let stage = if err.is_syntax() || err.is_eof() {
            "parse"
        } else if err.is_data() {
            "validate"
        } else {
            "read"
        };
        Self::serialization("json", format!("JSON {stage} error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(TallyError::invalid_input("x").category(), "invalid_input");
        assert_eq!(TallyError::configuration("limits", "x").category(), "configuration");
        assert_eq!(TallyError::serialization("toml", "x").category(), "serialization");
    }

    #[test]
    fn test_invalid_key_carries_context() {
        let err = TallyError::invalid_key("SKU-1", "duplicate key");
        match &err {
            TallyError::InvalidInput { key, field, .. } => {
                assert_eq!(key.as_deref(), Some("SKU-1"));
                assert!(field.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_input_error());
        assert_eq!(err.to_string(), "Invalid input: duplicate key");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: TallyError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.category(), "serialization");
        assert!(err.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_io_error_is_not_input_error() {
        let err: TallyError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.category(), "io");
        assert!(!err.is_input_error());
    }
}
