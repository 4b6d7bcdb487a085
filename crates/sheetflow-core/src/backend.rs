//! Backend capability traits
//!
//! A backend is anything that can address individual cells of named sheets.
//! The dispatcher in [`crate::dispatch`] translates shaped ranges into
//! calls on these traits; backends never see a [`Shape`](crate::Shape).
//!
//! Writers and readers are separate traits because most storage formats
//! stream in one direction only. A backend instance is confined to a single
//! job and is never shared between threads, but it must be `Send` so that
//! batch runs can move it onto a worker.

use crate::error::{Error, Result};
use crate::value::{LogicalType, Value};
use crate::{MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN};

/// Opaque reference to a sheet inside one backend instance
///
/// Handles are only meaningful to the backend that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetHandle(usize);

impl SheetHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Addressable grid size of a backend (exclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub max_rows: u32,
    pub max_cols: u32,
}

impl Capacity {
    /// Spreadsheet grid limits (1,048,576 rows x 16,384 columns)
    pub const EXCEL: Capacity = Capacity {
        max_rows: MAX_ROWS,
        max_cols: MAX_COLS,
    };

    /// No limit beyond the `u32` coordinate space
    pub const UNBOUNDED: Capacity = Capacity {
        max_rows: u32::MAX,
        max_cols: u32::MAX,
    };

    pub fn new(max_rows: u32, max_cols: u32) -> Self {
        Self { max_rows, max_cols }
    }

    /// Fail with [`Error::OutOfRange`] if `(row, col)` is not addressable
    pub fn check(&self, row: u32, col: u32) -> Result<()> {
        if row < self.max_rows && col < self.max_cols {
            Ok(())
        } else {
            Err(Error::OutOfRange {
                row,
                col,
                max_rows: self.max_rows,
                max_cols: self.max_cols,
            })
        }
    }

    /// Check an exclusive `(end_row, end_col)` extent
    ///
    /// Reports the first cell that falls outside the grid.
    pub fn check_extent(&self, end_row: u32, end_col: u32) -> Result<()> {
        if end_row <= self.max_rows && end_col <= self.max_cols {
            return Ok(());
        }
        let row = if end_row > self.max_rows {
            self.max_rows
        } else {
            end_row - 1
        };
        let col = if end_col > self.max_cols {
            self.max_cols
        } else {
            end_col - 1
        };
        Err(Error::OutOfRange {
            row,
            col,
            max_rows: self.max_rows,
            max_cols: self.max_cols,
        })
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::EXCEL
    }
}

/// Cell-level write access to a workbook-like target
pub trait WriteBackend: Send {
    /// What [`finalize`](WriteBackend::finalize) hands back (a path, an in-memory copy, ...)
    type Persisted;

    /// Create the named sheet, or open it if it already exists
    fn create_sheet(&mut self, name: &str) -> Result<SheetHandle>;

    /// Store one value at a 0-based cell position
    ///
    /// `dtype` governs formatting and coercion only. Storing
    /// [`Value::Empty`] blanks the cell.
    fn set_cell(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        value: &Value,
        dtype: LogicalType,
    ) -> Result<()>;

    /// Store consecutive values rightward from `(row, col)`
    ///
    /// Backends with a cheaper bulk path may override this; the observable
    /// result must match a sequence of [`set_cell`](WriteBackend::set_cell) calls.
    fn set_row(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        values: &[Value],
        dtype: LogicalType,
    ) -> Result<()> {
        let capacity = self.capacity();
        for (offset, value) in values.iter().enumerate() {
            let col = u32::try_from(offset)
                .ok()
                .and_then(|o| col.checked_add(o))
                .ok_or(Error::OutOfRange {
                    row,
                    col: u32::MAX,
                    max_rows: capacity.max_rows,
                    max_cols: capacity.max_cols,
                })?;
            self.set_cell(sheet, row, col, value, dtype)?;
        }
        Ok(())
    }

    /// Addressable grid of this backend
    fn capacity(&self) -> Capacity {
        Capacity::EXCEL
    }

    /// Flush everything to the target and release the backend
    fn finalize(self) -> Result<Self::Persisted>
    where
        Self: Sized;
}

/// Cell-level read access to a workbook-like source
pub trait ReadBackend: Send {
    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Open an existing sheet by name
    fn open_sheet(&mut self, name: &str) -> Result<SheetHandle>;

    /// Load one cell converted to `dtype`
    ///
    /// Fails with [`Error::TypeMismatch`] when the stored content cannot be
    /// represented as `dtype`. A blank cell read as anything but
    /// [`LogicalType::Any`] is a mismatch.
    fn get_cell(&self, sheet: SheetHandle, row: u32, col: u32, dtype: LogicalType)
        -> Result<Value>;

    /// Addressable grid of this backend
    fn capacity(&self) -> Capacity {
        Capacity::EXCEL
    }
}

/// Coerce `value` for storage under `dtype`
///
/// Blank values always pass so that ranges can clear cells.
pub fn coerce_for_write(value: &Value, dtype: LogicalType, row: u32, col: u32) -> Result<Value> {
    if value.is_empty() {
        return Ok(Value::Empty);
    }
    value.coerce(dtype).ok_or_else(|| Error::TypeMismatch {
        row,
        col,
        expected: dtype,
        found: describe_found(value),
    })
}

/// Coerce a stored value to the type a reader asked for
pub fn coerce_for_read(value: &Value, dtype: LogicalType, row: u32, col: u32) -> Result<Value> {
    value.coerce(dtype).ok_or_else(|| Error::TypeMismatch {
        row,
        col,
        expected: dtype,
        found: describe_found(value),
    })
}

fn describe_found(value: &Value) -> String {
    match value {
        Value::Empty => "empty cell".to_string(),
        Value::Str(s) => format!("string {:?}", s),
        other => format!("{} {}", other.type_name(), other),
    }
}

/// Validate a sheet name against spreadsheet naming rules
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(format!(
            "Sheet name too long (max {} characters)",
            MAX_SHEET_NAME_LEN
        )));
    }

    const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
    for c in INVALID_CHARS {
        if name.contains(*c) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }
    }
    Ok(())
}

/// Find a sheet by name, ignoring ASCII case like spreadsheet applications do
pub fn find_sheet<'a, I>(names: I, name: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().position(|n| n.eq_ignore_ascii_case(name))
}
