//! Error types for sheetflow-core

use std::fmt;

use thiserror::Error;

use crate::value::LogicalType;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while describing, dispatching or persisting ranges
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid range geometry (zero-sized shape, negative anchor, overflowing extent)
    #[error("Malformed range: {0}")]
    MalformedRange(String),

    /// Payload does not have the arity declared by the range shape
    #[error("Payload arity mismatch: range expects {expected}, got {actual}")]
    PayloadArityMismatch { expected: String, actual: String },

    /// Backend rejected a cell address
    #[error("Cell ({row}, {col}) out of range (capacity: {max_rows} rows x {max_cols} columns)")]
    OutOfRange {
        row: u32,
        col: u32,
        max_rows: u32,
        max_cols: u32,
    },

    /// Cell content could not be coerced to the declared logical type
    #[error("Cell ({row}, {col}) cannot be treated as {expected}: found {found}")]
    TypeMismatch {
        row: u32,
        col: u32,
        expected: LogicalType,
        found: String,
    },

    /// Invalid A1-style cell address
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Sheet not found by name or handle
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Backend failed to load or persist a target
    #[error("Persistence failed for '{target}': {source}")]
    Persistence {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Wrap a backend I/O failure for `target`
    pub fn persistence<T, E>(target: T, source: E) -> Self
    where
        T: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Persistence {
            target: target.into(),
            source: source.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedRange(_) => ErrorKind::MalformedRange,
            Error::PayloadArityMismatch { .. } => ErrorKind::PayloadArityMismatch,
            Error::OutOfRange { .. } => ErrorKind::OutOfRange,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Error::InvalidSheetName(_) | Error::SheetNotFound(_) => ErrorKind::Sheet,
            Error::Persistence { .. } => ErrorKind::Persistence,
            Error::Other(_) => ErrorKind::Other,
        }
    }
}

/// Coarse error classification, reported per target by batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedRange,
    PayloadArityMismatch,
    OutOfRange,
    TypeMismatch,
    InvalidAddress,
    Sheet,
    Persistence,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedRange => "MalformedRange",
            ErrorKind::PayloadArityMismatch => "PayloadArityMismatch",
            ErrorKind::OutOfRange => "OutOfRange",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::InvalidAddress => "InvalidAddress",
            ErrorKind::Sheet => "Sheet",
            ErrorKind::Persistence => "PersistenceError",
            ErrorKind::Other => "Other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::persistence("out.xlsx", io);
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "Persistence failed for 'out.xlsx': denied");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::Persistence.to_string(), "PersistenceError");
        assert_eq!(
            Error::MalformedRange("Row(0)".into()).kind(),
            ErrorKind::MalformedRange
        );
    }
}
