//! Core error types for the import engine.
//!
//! The pure parse/merge pipeline speaks [`ImportError`] only. The orchestrating
//! service layer wraps it in the root [`Error`] together with collaborator
//! failures (persistence, binary document import).

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias used by the synchronous parse/merge pipeline.
pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Root error type for the import engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Document import failed: {0}")]
    Document(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Errors raised while turning raw statement text into positions.
///
/// Row-level variants (`MalformedRow`, `MalformedNumber`, `MalformedDate`) are
/// recovered by skipping the row. `UnrecognizedFormat` is recovered by the
/// dispatcher trying the next dialect. Only `EmptyImport` and `ImportFailed`
/// reach the caller.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The header signature did not match the requested dialect.
    #[error("Unrecognized {dialect} format: {reason}")]
    UnrecognizedFormat { dialect: String, reason: String },

    /// A single data row could not be extracted.
    #[error("Malformed row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Malformed number: '{0}'")]
    MalformedNumber(String),

    #[error("Malformed date: '{0}'")]
    MalformedDate(String),

    /// No files, or zero usable rows across all files.
    #[error("Nothing to import: {0}")]
    EmptyImport(String),

    /// The fallback chain was exhausted after an explicit broker parser failed.
    #[error("Could not import {broker} statement: {cause}")]
    ImportFailed {
        broker: String,
        #[source]
        cause: Box<ImportError>,
    },
}

impl ImportError {
    pub fn unrecognized(dialect: impl Into<String>, reason: impl Into<String>) -> Self {
        ImportError::UnrecognizedFormat {
            dialect: dialect.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_row(line: usize, reason: impl Into<String>) -> Self {
        ImportError::MalformedRow {
            line,
            reason: reason.into(),
        }
    }

    /// Errors that only invalidate the row they were raised for.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            ImportError::MalformedRow { .. }
                | ImportError::MalformedNumber(_)
                | ImportError::MalformedDate(_)
        )
    }

    pub fn is_unrecognized_format(&self) -> bool {
        matches!(self, ImportError::UnrecognizedFormat { .. })
    }
}

/// Validation errors for caller input and configuration.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown broker identifier '{0}'")]
    UnknownBroker(String),

    #[error("Unknown merge strategy '{0}'")]
    UnknownMergeStrategy(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// === From implementations for common error types ===

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidConfig(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_level_classification() {
        assert!(ImportError::malformed_row(3, "missing symbol").is_row_level());
        assert!(ImportError::MalformedNumber("abc".to_string()).is_row_level());
        assert!(ImportError::MalformedDate("32/13/2024".to_string()).is_row_level());
        assert!(!ImportError::unrecognized("schwab", "no header").is_row_level());
        assert!(!ImportError::EmptyImport("no files".to_string()).is_row_level());
    }

    #[test]
    fn test_import_failed_carries_cause() {
        let err = ImportError::ImportFailed {
            broker: "fidelity".to_string(),
            cause: Box::new(ImportError::unrecognized("fidelity", "header not found")),
        };
        let message = err.to_string();
        assert!(message.contains("fidelity"));
        assert!(message.contains("header not found"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_into_string() {
        let err: Error = ImportError::EmptyImport("no files".to_string()).into();
        let s: String = err.into();
        assert_eq!(s, "Import failed: Nothing to import: no files");
    }
}
