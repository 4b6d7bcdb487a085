//! Target format selection

use std::fmt;
use std::path::Path;

use sheetflow_core::{Error, Result};

/// Storage format of a workbook target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// Office Open XML workbook (`.xlsx`, `.xlsm` for reading)
    Xlsx,
    /// Directory of `<sheet>.csv` files, or a single `.csv` file
    Csv,
}

impl FileFormat {
    /// Pick the format for a target path
    ///
    /// `.xlsx` and `.xlsm` select XLSX. `.csv`, an existing directory and a
    /// path without extension select CSV. Anything else is unsupported.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<FileFormat> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => Ok(FileFormat::Xlsx),
            Some("csv") | None => Ok(FileFormat::Csv),
            Some(_) if path.is_dir() => Ok(FileFormat::Csv),
            Some(_) => Err(Error::other(format!(
                "Unsupported file format: {}",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Xlsx => write!(f, "xlsx"),
            FileFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(FileFormat::detect("out/report.xlsx").unwrap(), FileFormat::Xlsx);
        assert_eq!(FileFormat::detect("REPORT.XLSM").unwrap(), FileFormat::Xlsx);
        assert_eq!(FileFormat::detect("data.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::detect("out/report").unwrap(), FileFormat::Csv);
        assert!(FileFormat::detect("notes.txt").is_err());
    }

    #[test]
    fn test_directory_with_dot_is_csv() {
        let dir = tempfile::Builder::new().suffix(".v2").tempdir().unwrap();
        assert_eq!(FileFormat::detect(dir.path()).unwrap(), FileFormat::Csv);
    }
}
