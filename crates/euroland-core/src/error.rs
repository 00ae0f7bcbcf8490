//! Unified error handling for the EuroLand exporters
//!
//! This module provides the error type shared by the scene model and the
//! exporters. Exporter-specific failures wrap it.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for scene loading and validation
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Data Errors ====================

    /// Invalid data structure
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    /// Missing required field
    #[error("Missing required field: {field}")]
    MissingField {
        field: String,
    },

    /// A named reference (mesh, material, parent, bone...) does not resolve
    #[error("Unresolved {kind} reference: {name}")]
    MissingReference {
        kind: String,
        name: String,
    },

    /// Same name declared twice where names must be unique
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName {
        kind: String,
        name: String,
    },

    /// Parent chain loops back on itself
    #[error("Cyclic {kind} hierarchy at: {name}")]
    CyclicHierarchy {
        kind: String,
        name: String,
    },

    /// Scene description could not be deserialized
    #[error("Malformed scene description: {message}")]
    Malformed {
        message: String,
    },

    // ==================== Export Errors ====================

    /// Unsupported format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        format: String,
    },

    /// Export failed
    #[error("Export failed: {message}")]
    ExportFailed {
        message: String,
    },

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Error::MissingField {
            field: field.into(),
        }
    }

    /// Create an unresolved reference error
    pub fn missing_reference(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::MissingReference {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a duplicate name error
    pub fn duplicate_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::DuplicateName {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a cyclic hierarchy error
    pub fn cyclic(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::CyclicHierarchy {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Innermost error, skipping context wrappers
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::FileNotFound(_) | Error::MissingReference { .. }
        )
    }

    /// Check if this error comes from scene validation
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::InvalidData { .. }
                | Error::MissingField { .. }
                | Error::MissingReference { .. }
                | Error::DuplicateName { .. }
                | Error::CyclicHierarchy { .. }
        )
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::FileNotFound(PathBuf::from("/scene.json"));
        let contextualized = err.with_context("while loading scene");

        assert!(contextualized.to_string().contains("while loading scene"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::FileNotFound(PathBuf::from("/test")).is_not_found());
        assert!(Error::missing_reference("mesh", "Cube").is_not_found());
        assert!(!Error::invalid_data("bad").is_not_found());
    }

    #[test]
    fn test_validation_error_through_context() {
        let err = Error::cyclic("object", "A").with_context("validating scene");
        assert!(err.is_validation_error());
        assert!(!Error::InvalidConfig { message: "x".into() }.is_validation_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::missing_field("name"));
        let with_context = result.context("reading mesh");

        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().to_string().contains("reading mesh"));
    }
}
