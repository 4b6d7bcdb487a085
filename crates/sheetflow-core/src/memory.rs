//! In-memory workbook backend

use std::collections::BTreeMap;

use crate::backend::{
    coerce_for_read, coerce_for_write, find_sheet, validate_sheet_name, Capacity, ReadBackend,
    SheetHandle, WriteBackend,
};
use crate::error::{Error, Result};
use crate::value::{LogicalType, Value};

/// A named sheet of sparse cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemorySheet {
    name: String,
    cells: BTreeMap<(u32, u32), Value>,
}

impl MemorySheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a cell value, `None` if blank
    pub fn get(&self, row: u32, col: u32) -> Option<&Value> {
        self.cells.get(&(row, col))
    }

    /// Iterate non-blank cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &Value)> {
        self.cells.iter().map(|(&pos, v)| (pos, v))
    }

    /// Number of non-blank cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A workbook that lives entirely in memory
///
/// Useful as a reference backend and in tests: it implements both
/// [`WriteBackend`] and [`ReadBackend`], and finalizing hands the workbook
/// itself back.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
    capacity: Capacity,
}

impl MemoryWorkbook {
    /// Create an empty workbook with spreadsheet grid limits
    pub fn new() -> Self {
        Self::with_capacity(Capacity::EXCEL)
    }

    pub fn with_capacity(capacity: Capacity) -> Self {
        Self {
            sheets: Vec::new(),
            capacity,
        }
    }

    /// Get a sheet by name
    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        find_sheet(self.sheets.iter().map(|s| s.name.as_str()), name).map(|i| &self.sheets[i])
    }

    /// Get the stored value at a position, `None` if blank or the sheet is missing
    pub fn value_at(&self, sheet: &str, row: u32, col: u32) -> Option<&Value> {
        self.sheet(sheet)?.get(row, col)
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    fn sheet_at(&self, handle: SheetHandle) -> Result<&MemorySheet> {
        self.sheets
            .get(handle.index())
            .ok_or_else(|| Error::SheetNotFound(format!("handle {}", handle.index())))
    }
}

impl Default for MemoryWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBackend for MemoryWorkbook {
    type Persisted = MemoryWorkbook;

    fn create_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        if let Some(index) = find_sheet(self.sheets.iter().map(|s| s.name.as_str()), name) {
            return Ok(SheetHandle::new(index));
        }
        validate_sheet_name(name)?;
        self.sheets.push(MemorySheet {
            name: name.to_string(),
            cells: BTreeMap::new(),
        });
        Ok(SheetHandle::new(self.sheets.len() - 1))
    }

    fn set_cell(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        value: &Value,
        dtype: LogicalType,
    ) -> Result<()> {
        self.capacity.check(row, col)?;
        let value = coerce_for_write(value, dtype, row, col)?;
        let sheet = self
            .sheets
            .get_mut(sheet.index())
            .ok_or_else(|| Error::SheetNotFound(format!("handle {}", sheet.index())))?;
        if value.is_empty() {
            sheet.cells.remove(&(row, col));
        } else {
            sheet.cells.insert((row, col), value);
        }
        Ok(())
    }

    fn capacity(&self) -> Capacity {
        self.capacity
    }

    fn finalize(self) -> Result<Self::Persisted> {
        Ok(self)
    }
}

impl ReadBackend for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn open_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        find_sheet(self.sheets.iter().map(|s| s.name.as_str()), name)
            .map(SheetHandle::new)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    fn get_cell(
        &self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        dtype: LogicalType,
    ) -> Result<Value> {
        self.capacity.check(row, col)?;
        let stored = self.sheet_at(sheet)?.get(row, col).unwrap_or(&Value::Empty);
        coerce_for_read(stored, dtype, row, col)
    }

    fn capacity(&self) -> Capacity {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_or_open() {
        let mut wb = MemoryWorkbook::new();
        let a = wb.create_sheet("Data").unwrap();
        let b = wb.create_sheet("data").unwrap();
        assert_eq!(a, b);
        assert_eq!(wb.sheet_count(), 1);
        assert!(wb.create_sheet("bad/name").is_err());
    }

    #[test]
    fn test_blank_clears_cell() {
        let mut wb = MemoryWorkbook::new();
        let sheet = wb.create_sheet("S").unwrap();
        wb.set_cell(sheet, 0, 0, &Value::Int(1), LogicalType::Int).unwrap();
        assert_eq!(wb.value_at("S", 0, 0), Some(&Value::Int(1)));
        wb.set_cell(sheet, 0, 0, &Value::Empty, LogicalType::Int).unwrap();
        assert_eq!(wb.value_at("S", 0, 0), None);
    }

    #[test]
    fn test_read_coerces() {
        let mut wb = MemoryWorkbook::new();
        let sheet = wb.create_sheet("S").unwrap();
        wb.set_cell(sheet, 1, 1, &Value::Int(3), LogicalType::Any).unwrap();
        assert_eq!(
            wb.get_cell(sheet, 1, 1, LogicalType::Float).unwrap(),
            Value::Float(3.0)
        );
        assert!(matches!(
            wb.get_cell(sheet, 1, 1, LogicalType::Bool),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            wb.get_cell(sheet, 5, 5, LogicalType::Int),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(wb.get_cell(sheet, 5, 5, LogicalType::Any).unwrap(), Value::Empty);
    }

    #[test]
    fn test_out_of_range() {
        let mut wb = MemoryWorkbook::with_capacity(Capacity::new(2, 2));
        let sheet = wb.create_sheet("S").unwrap();
        assert!(matches!(
            wb.set_cell(sheet, 2, 0, &Value::Int(1), LogicalType::Int),
            Err(Error::OutOfRange { .. })
        ));
    }
}
