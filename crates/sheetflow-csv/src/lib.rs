//! # sheetflow-csv
//!
//! CSV backend for sheetflow.
//!
//! A CSV workbook is a directory holding one `<sheet>.csv` file per sheet.
//! The writer buffers every sheet in memory and persists them on
//! `finalize`; the reader loads a sheet once when it is opened and serves
//! cell reads from memory.

mod error;
mod options;
mod reader;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{CsvOptions, LineTerminator};
pub use reader::CsvWorkbookReader;
pub use writer::CsvWorkbookWriter;

/// File extension used for sheet files
pub const SHEET_EXTENSION: &str = "csv";
