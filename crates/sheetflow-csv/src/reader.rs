//! CSV reader

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use sheetflow_core::backend::find_sheet;
use sheetflow_core::{
    coerce_for_read, Capacity, Error, LogicalType, ReadBackend, Result, SheetHandle, Value,
};

use crate::error::{CsvError, CsvResult};
use crate::options::CsvOptions;
use crate::SHEET_EXTENSION;

/// Reads a workbook stored as a directory of CSV files
///
/// A path to a single `.csv` file is read as a one-sheet workbook named
/// after the file stem.
#[derive(Debug)]
pub struct CsvWorkbookReader {
    path: PathBuf,
    options: CsvOptions,
    sheets: Vec<SheetSource>,
}

#[derive(Debug)]
struct SheetSource {
    name: String,
    file: PathBuf,
    rows: Option<Vec<Vec<String>>>,
}

impl CsvWorkbookReader {
    /// Open a CSV workbook with default options
    pub fn open<P: AsRef<Path>>(path: P) -> CsvResult<Self> {
        Self::open_with_options(path, CsvOptions::default())
    }

    /// Open a CSV workbook, listing its sheets without loading them
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: CsvOptions) -> CsvResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut sheets = Vec::new();

        if path.is_file() {
            sheets.push(SheetSource {
                name: sheet_name_of(&path),
                file: path.clone(),
                rows: None,
            });
        } else {
            for entry in fs::read_dir(&path)? {
                let file = entry?.path();
                let is_sheet = file.is_file()
                    && file
                        .extension()
                        .map_or(false, |ext| ext.eq_ignore_ascii_case(SHEET_EXTENSION));
                if is_sheet {
                    sheets.push(SheetSource {
                        name: sheet_name_of(&file),
                        file,
                        rows: None,
                    });
                }
            }
            // read_dir order is platform dependent
            sheets.sort_by(|a, b| a.name.cmp(&b.name));
        }

        debug!("opened {} ({} sheets)", path.display(), sheets.len());
        Ok(Self {
            path,
            options,
            sheets,
        })
    }

    /// Workbook location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, file: &Path) -> CsvResult<Vec<Vec<String>>> {
        let mut text = String::new();
        File::open(file)?.read_to_string(&mut text)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn field(&self, sheet: SheetHandle, row: u32, col: u32) -> Result<Option<&str>> {
        let source = self
            .sheets
            .get(sheet.index())
            .ok_or_else(|| Error::SheetNotFound(format!("handle {}", sheet.index())))?;
        let rows = source
            .rows
            .as_ref()
            .ok_or_else(|| Error::SheetNotFound(format!("{} is not open", source.name)))?;
        Ok(rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .map(String::as_str))
    }

    fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(text.trim(), &self.options.date_format).ok()
    }

    fn parse_datetime(&self, text: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text.trim(), &self.options.datetime_format).ok()
    }

    /// Guess the value stored in an untyped field
    fn detect_type(&self, field: &str) -> Value {
        let trimmed = field.trim();

        if trimmed.is_empty() {
            return Value::Empty;
        }

        if let Some(b) = sheetflow_core::value::parse_bool(trimmed) {
            return Value::Bool(b);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int(n);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Float(n);
        }
        if let Some(d) = self.parse_date(trimmed) {
            return Value::Date(d);
        }
        if let Some(dt) = self.parse_datetime(trimmed) {
            return Value::DateTime(dt);
        }

        Value::string(field)
    }
}

fn sheet_name_of(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ReadBackend for CsvWorkbookReader {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn open_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        let index = find_sheet(self.sheets.iter().map(|s| s.name.as_str()), name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;

        if self.sheets[index].rows.is_none() {
            let file = self.sheets[index].file.clone();
            let rows = self
                .load(&file)
                .map_err(|e: CsvError| e.into_core(&file))?;
            debug!("loaded sheet '{}' ({} rows)", name, rows.len());
            self.sheets[index].rows = Some(rows);
        }
        Ok(SheetHandle::new(index))
    }

    fn get_cell(
        &self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        dtype: LogicalType,
    ) -> Result<Value> {
        let field = self.field(sheet, row, col)?.unwrap_or("");

        let value = match dtype {
            // CSV cannot tell a blank cell from an empty string
            LogicalType::Str => Value::string(field),
            _ if field.trim().is_empty() => Value::Empty,
            LogicalType::Any => return Ok(self.detect_type(field)),
            LogicalType::Date => match self.parse_date(field) {
                Some(d) => Value::Date(d),
                None => Value::string(field),
            },
            LogicalType::DateTime => match self.parse_datetime(field) {
                Some(dt) => Value::DateTime(dt),
                None => Value::string(field),
            },
            _ => Value::string(field),
        };
        coerce_for_read(&value, dtype, row, col)
    }

    fn capacity(&self) -> Capacity {
        Capacity::UNBOUNDED
    }
}
