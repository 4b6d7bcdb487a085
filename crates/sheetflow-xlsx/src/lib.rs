//! # sheetflow-xlsx
//!
//! XLSX (Office Open XML) backend for sheetflow.
//!
//! [`XlsxWorkbookWriter`] buffers cells per row and emits every worksheet
//! in ascending row and column order when finalized. [`XlsxWorkbookReader`]
//! loads a worksheet in full the first time it is opened.
//!
//! Dates and date-times are stored as 1900-system serial numbers with the
//! built-in number formats 14 (`m/d/yyyy`) and 22 (`m/d/yyyy h:mm`).

pub mod dates;
pub mod error;
pub mod reader;
pub mod writer;

mod escape;
mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxWorkbookReader;
pub use writer::XlsxWorkbookWriter;
