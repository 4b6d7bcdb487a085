//! # sheetflow
//!
//! Move shape-typed ranges between Rust values and spreadsheet files.
//!
//! A [`RangeSpec`] says where a block of cells lives (anchor and
//! [`Shape`]) and what it holds ([`LogicalType`]). The dispatcher expands it
//! into cell operations on any [`WriteBackend`] or [`ReadBackend`], and the
//! batch executor fans whole jobs out over a worker pool, one backend per
//! target.
//!
//! ## Features
//!
//! - XLSX and CSV backends, chosen per target with [`FileFormat::detect`]
//! - An in-memory backend for tests and staging
//! - Parallel batches with per-target success or failure
//!
//! ## Example
//!
//! ```rust
//! use sheetflow::prelude::*;
//!
//! let header = RangeSpec::at("A1", Shape::Row(3), LogicalType::Str).unwrap();
//! let body = RangeSpec::at("A2", Shape::Matrix(2, 3), LogicalType::Int).unwrap();
//!
//! let jobs: Vec<WriteJob> = ["north", "south"]
//!     .into_iter()
//!     .map(|region| {
//!         WriteJob::new(region)
//!             .range("Sales", header, Payload::vector(["q1", "q2", "q3"]))
//!             .range("Sales", body, Payload::matrix([[1, 2, 3], [4, 5, 6]]))
//!     })
//!     .collect();
//!
//! let report = run_write_batch(&jobs, &BatchOptions::default(), |_| Ok(MemoryWorkbook::new()));
//! assert!(report.is_success());
//!
//! let (_, workbook) = report.succeeded().next().unwrap();
//! assert_eq!(workbook.value_at("Sales", 2, 2), Some(&Value::Int(6)));
//! ```

pub mod batch;
pub mod file;
pub mod format;
pub mod job;
pub mod prelude;

pub use batch::{
    read_many, run_read_batch, run_write_batch, write_many, BatchOptions, BatchReport, JobOutcome,
    SheetResults, WORKERS_ENV,
};
pub use file::{FileReader, FileWriter};
pub use format::FileFormat;
pub use job::{ReadJob, SheetPayloads, SheetReads, SheetSelector, SheetWrites, WriteJob};

// Re-export core types
pub use sheetflow_core::{
    column_to_letters, dispatch, letters_to_column, read_all, read_keyed, read_range, write_range,
    write_range_bulk, Capacity, Error, ErrorKind, LogicalType, MemoryWorkbook, Payload, Position,
    RangeSpec, ReadBackend, Result, Shape, SheetHandle, Value, WriteBackend, MAX_COLS, MAX_ROWS,
};

// Re-export I/O types
pub use sheetflow_csv::{CsvError, CsvOptions, CsvWorkbookReader, CsvWorkbookWriter};
pub use sheetflow_xlsx::{XlsxError, XlsxWorkbookReader, XlsxWorkbookWriter};
