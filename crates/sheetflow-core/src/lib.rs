//! # sheetflow-core
//!
//! Shape-typed range transfer between structured values and tabular
//! storage backends.
//!
//! This crate provides the backend-independent pieces of sheetflow:
//! - [`LogicalType`] and [`Value`] - Declared cell types and typed values
//! - [`Shape`], [`Position`] and [`RangeSpec`] - Range geometry
//! - [`Payload`] - Values carried to or from a range
//! - [`WriteBackend`] and [`ReadBackend`] - The cell-level capability traits
//! - [`dispatch`] - Shape-to-cell traversal in row-major order
//! - [`MemoryWorkbook`] - An in-memory reference backend
//!
//! ## Example
//!
//! ```rust
//! use sheetflow_core::{dispatch, LogicalType, MemoryWorkbook, Payload, RangeSpec, Shape, WriteBackend};
//!
//! let mut wb = MemoryWorkbook::new();
//! let sheet = wb.create_sheet("Data").unwrap();
//!
//! let range = RangeSpec::at("B2", Shape::Matrix(2, 2), LogicalType::Int).unwrap();
//! let payload = Payload::matrix([[1, 2], [3, 4]]);
//! dispatch::write_range(&mut wb, sheet, &range, &payload).unwrap();
//!
//! let back = dispatch::read_range(&wb, sheet, &range).unwrap();
//! assert_eq!(back, payload);
//! ```

pub mod address;
pub mod backend;
pub mod dispatch;
pub mod error;
pub mod memory;
pub mod payload;
pub mod range;
pub mod shape;
pub mod value;

// Re-exports for convenience
pub use address::{column_to_letters, letters_to_column, Position};
pub use backend::{
    coerce_for_read, coerce_for_write, find_sheet, validate_sheet_name, Capacity, ReadBackend, SheetHandle,
    WriteBackend,
};
pub use dispatch::{read_all, read_keyed, read_range, write_range, write_range_bulk};
pub use error::{Error, ErrorKind, Result};
pub use memory::{MemorySheet, MemoryWorkbook};
pub use payload::Payload;
pub use range::RangeSpec;
pub use shape::Shape;
pub use value::{LogicalType, Value};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
