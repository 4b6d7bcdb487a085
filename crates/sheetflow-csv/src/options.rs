//! CSV options

use sheetflow_core::value::{DATETIME_FORMAT, DATE_FORMAT};

/// Options for reading and writing CSV sheets
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Line terminator used when writing
    pub line_terminator: LineTerminator,
    /// chrono format for `Date` cells
    pub date_format: String,
    /// chrono format for `DateTime` cells
    pub datetime_format: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            line_terminator: LineTerminator::CRLF,
            date_format: DATE_FORMAT.to_string(),
            datetime_format: DATETIME_FORMAT.to_string(),
        }
    }
}

impl CsvOptions {
    pub(crate) fn terminator(&self) -> csv::Terminator {
        match self.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
            LineTerminator::CR => csv::Terminator::Any(b'\r'),
        }
    }
}

/// Line terminator type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    /// Unix-style (LF)
    LF,
    /// Windows-style (CRLF)
    CRLF,
    /// Mac classic (CR)
    CR,
}
