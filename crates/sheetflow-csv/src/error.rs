//! CSV error types

use std::path::Path;

use thiserror::Error;

/// Result type for CSV operations
pub type CsvResult<T> = std::result::Result<T, CsvError>;

/// Errors that can occur during CSV operations
#[derive(Debug, Error)]
pub enum CsvError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV library error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] sheetflow_core::Error),
}

impl CsvError {
    /// Surface this error through the backend interface
    ///
    /// Core errors pass through unchanged; everything else becomes a
    /// persistence failure for `target`.
    pub fn into_core(self, target: &Path) -> sheetflow_core::Error {
        match self {
            CsvError::Core(e) => e,
            other => sheetflow_core::Error::persistence(target.display().to_string(), other),
        }
    }
}
