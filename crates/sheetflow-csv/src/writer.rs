//! CSV writer

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use sheetflow_core::backend::find_sheet;
use sheetflow_core::{
    coerce_for_write, validate_sheet_name, Capacity, Error, LogicalType, Result, SheetHandle,
    Value, WriteBackend,
};

use crate::error::CsvResult;
use crate::options::CsvOptions;
use crate::SHEET_EXTENSION;

/// Buffered cells of one sheet, keyed by row then column
#[derive(Debug, Default)]
struct SheetBuffer {
    name: String,
    rows: BTreeMap<u32, BTreeMap<u32, String>>,
}

impl SheetBuffer {
    fn insert(&mut self, row: u32, col: u32, text: String) {
        self.rows.entry(row).or_default().insert(col, text);
    }

    fn remove(&mut self, row: u32, col: u32) {
        if let Some(cells) = self.rows.get_mut(&row) {
            cells.remove(&col);
            if cells.is_empty() {
                self.rows.remove(&row);
            }
        }
    }

    /// Exclusive (rows, cols) bound of the written cells
    fn used_extent(&self) -> (u32, u32) {
        let rows = self.rows.keys().next_back().map_or(0, |r| r + 1);
        let cols = self
            .rows
            .values()
            .filter_map(|cells| cells.keys().next_back())
            .max()
            .map_or(0, |c| c + 1);
        (rows, cols)
    }
}

/// Writes a workbook as a directory of CSV files
///
/// Nothing touches the filesystem until [`finalize`](WriteBackend::finalize),
/// which creates the directory and stages every sheet in a temporary file.
/// Sheet files are only moved into place once all of them were staged, so
/// a failed run leaves none of its sheets behind.
#[derive(Debug)]
pub struct CsvWorkbookWriter {
    dir: PathBuf,
    options: CsvOptions,
    sheets: Vec<SheetBuffer>,
}

impl CsvWorkbookWriter {
    /// Create a writer targeting `dir` with default options
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self::with_options(dir, CsvOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(dir: P, options: CsvOptions) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            options,
            sheets: Vec::new(),
        }
    }

    /// Target directory
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn format(&self, value: &Value) -> String {
        match value {
            Value::Empty => String::new(),
            // Debug keeps a trailing `.0` so integral floats stay floats
            Value::Float(n) => format!("{:?}", n),
            Value::Date(d) => d.format(&self.options.date_format).to_string(),
            Value::DateTime(dt) => dt.format(&self.options.datetime_format).to_string(),
            other => other.to_string(),
        }
    }

    fn sheet_path(&self, sheet: &SheetBuffer) -> PathBuf {
        self.dir.join(format!("{}.{}", sheet.name, SHEET_EXTENSION))
    }

    /// Write one sheet as rectangular records into `tmp`
    fn write_sheet(&self, sheet: &SheetBuffer, tmp: &Path) -> CsvResult<()> {
        let file = File::create(tmp)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .terminator(self.options.terminator())
            .flexible(false)
            .from_writer(file);

        let (rows, cols) = sheet.used_extent();
        let blank = BTreeMap::new();
        for row in 0..rows {
            let cells = sheet.rows.get(&row).unwrap_or(&blank);
            let record: Vec<&str> = (0..cols)
                .map(|col| cells.get(&col).map_or("", String::as_str))
                .collect();
            writer.write_record(&record)?;
        }

        let mut file = writer.into_inner().map_err(|e| e.into_error())?;
        file.flush()?;
        debug!("staged {} ({} rows x {} columns)", tmp.display(), rows, cols);
        Ok(())
    }

    /// Stage every sheet in a temporary file, then move them all into place
    ///
    /// No sheet file is replaced unless every sheet was staged. Staged
    /// files are removed when staging or moving fails.
    fn persist(&self) -> CsvResult<()> {
        fs::create_dir_all(&self.dir)?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            let path = self.sheet_path(sheet);
            let tmp = path.with_extension(format!("{}.tmp", SHEET_EXTENSION));
            let result = self.write_sheet(sheet, &tmp);
            staged.push((tmp, path));
            if let Err(e) = result {
                discard(&staged);
                return Err(e);
            }
        }

        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, path) {
                discard(&staged[i..]);
                return Err(e.into());
            }
        }
        Ok(())
    }
}

/// Remove staged files, keeping the first error already being reported
fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        if tmp.is_file() {
            if let Err(e) = fs::remove_file(tmp) {
                warn!("could not remove {}: {}", tmp.display(), e);
            }
        }
    }
}

impl WriteBackend for CsvWorkbookWriter {
    type Persisted = PathBuf;

    fn create_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        if let Some(index) = find_sheet(self.sheets.iter().map(|s| s.name.as_str()), name) {
            return Ok(SheetHandle::new(index));
        }
        validate_sheet_name(name)?;
        self.sheets.push(SheetBuffer {
            name: name.to_string(),
            rows: BTreeMap::new(),
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
        let value = coerce_for_write(value, dtype, row, col)?;
        let text = self.format(&value);
        let buffer = self
            .sheets
            .get_mut(sheet.index())
            .ok_or_else(|| Error::SheetNotFound(format!("handle {}", sheet.index())))?;
        if value.is_empty() {
            buffer.remove(row, col);
        } else {
            buffer.insert(row, col, text);
        }
        Ok(())
    }

    fn capacity(&self) -> Capacity {
        Capacity::UNBOUNDED
    }

    fn finalize(self) -> Result<PathBuf> {
        self.persist().map_err(|e| e.into_core(&self.dir))?;
        debug!(
            "finalized {} ({} sheets)",
            self.dir.display(),
            self.sheets.len()
        );
        Ok(self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_keeps_fraction_marker() {
        let writer = CsvWorkbookWriter::new("unused");
        assert_eq!(writer.format(&Value::Float(2.0)), "2.0");
        assert_eq!(writer.format(&Value::Float(0.1)), "0.1");
        assert_eq!(writer.format(&Value::Int(2)), "2");
        assert_eq!(writer.format(&Value::Bool(true)), "TRUE");
    }

    #[test]
    fn test_used_extent() {
        let mut sheet = SheetBuffer::default();
        assert_eq!(sheet.used_extent(), (0, 0));
        sheet.insert(2, 1, "x".into());
        sheet.insert(0, 4, "y".into());
        assert_eq!(sheet.used_extent(), (3, 5));
        sheet.remove(0, 4);
        assert_eq!(sheet.used_extent(), (3, 2));
    }
}
