//! XLSX error types

use std::path::Path;

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX reading/writing
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// Missing required part
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] sheetflow_core::Error),
}

impl XlsxError {
    /// Surface this error through the backend interface
    ///
    /// Core errors pass through unchanged; everything else becomes a
    /// persistence failure for `target`.
    pub fn into_core(self, target: &Path) -> sheetflow_core::Error {
        match self {
            XlsxError::Core(e) => e,
            other => sheetflow_core::Error::persistence(target.display().to_string(), other),
        }
    }
}
