//! Custom error types for paramsync
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

use crate::models::ParameterKey;

/// The main error type for paramsync operations
#[derive(Error, Debug)]
pub enum ParamError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// A change item or identity is missing fields or carries malformed ones
    #[error("Validation error in {context}: missing or invalid field(s): {}", fields.join(", "))]
    Validation {
        context: String,
        fields: Vec<String>,
    },

    /// Generic input rejection that is not tied to named fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encryption or decryption failed, or no key material is available
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// Parameter store or audit log unavailable
    #[error("Storage error: {0}")]
    Storage(String),

    /// Whole-call failure talking to the external parameter store
    #[error("External sync error: {0}")]
    ExternalSync(String),

    /// An external path could not be built
    #[error("Path error: {0}")]
    Path(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Uniqueness violation at insert time
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// A single item of a batch failed; earlier items keep their effects
    #[error("Item {index} ({key}) failed after {applied} applied item(s): {source}")]
    Item {
        index: usize,
        key: String,
        applied: usize,
        #[source]
        source: Box<ParamError>,
    },
}

impl ParamError {
    /// Create a validation error for a set of fields
    pub fn validation(context: impl Into<String>, fields: Vec<String>) -> Self {
        Self::Validation {
            context: context.into(),
            fields,
        }
    }

    /// Create a "not found" error for parameters
    pub fn parameter_not_found(key: &ParameterKey) -> Self {
        Self::NotFound {
            entity_type: "Parameter",
            identifier: key.to_string(),
        }
    }

    /// Create a "duplicate" error for parameters
    pub fn parameter_exists(key: &ParameterKey) -> Self {
        Self::Duplicate {
            entity_type: "Parameter",
            identifier: key.to_string(),
        }
    }

    /// Wrap an item-level failure with its position in the batch
    pub fn item(index: usize, key: impl Into<String>, applied: usize, source: ParamError) -> Self {
        Self::Item {
            index,
            key: key.into(),
            applied,
            source: Box::new(source),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a uniqueness violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::Item { source, .. } => source.is_validation(),
            _ => false,
        }
    }

    /// Whether the caller's input was at fault (4xx) rather than the system (5xx)
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation { .. }
            | Self::InvalidInput(_)
            | Self::Path(_)
            | Self::NotFound { .. } => true,
            Self::Item { source, .. } => source.is_client_error(),
            _ => false,
        }
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for ParamError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ParamError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for paramsync operations
pub type ParamResult<T> = Result<T, ParamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParamError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_lists_fields() {
        let err = ParamError::validation("item 2", vec!["prefix".into(), "secret".into()]);
        assert_eq!(
            err.to_string(),
            "Validation error in item 2: missing or invalid field(s): prefix, secret"
        );
        assert!(err.is_validation());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_not_found_error() {
        let err = ParamError::parameter_not_found(&ParameterKey::new("db_host", "test"));
        assert_eq!(err.to_string(), "Parameter not found: /test/db_host");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_item_error_keeps_classification() {
        let inner = ParamError::validation("item 1", vec!["comment".into()]);
        let err = ParamError::item(1, "/test/db_host", 1, inner);
        assert!(err.is_validation());
        assert!(err.is_client_error());
        assert!(err.to_string().starts_with("Item 1 (/test/db_host) failed after 1 applied"));

        let storage = ParamError::item(0, "/test/x", 0, ParamError::Storage("down".into()));
        assert!(!storage.is_client_error());
    }

    #[test]
    fn test_system_errors_are_not_client_errors() {
        assert!(!ParamError::Cipher("no key".into()).is_client_error());
        assert!(!ParamError::Storage("disk".into()).is_client_error());
        assert!(!ParamError::ExternalSync("unreachable".into()).is_client_error());
        assert!(ParamError::Path("empty".into()).is_client_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ParamError = io_err.into();
        assert!(matches!(err, ParamError::Io(_)));
    }
}
