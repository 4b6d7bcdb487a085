//! File backends selected by target path
//!
//! [`FileWriter`] and [`FileReader`] wrap the XLSX and CSV backends behind
//! one type each, so that a batch can mix targets of both formats.

use std::path::{Path, PathBuf};

use sheetflow_core::{
    Capacity, Error, LogicalType, ReadBackend, Result, SheetHandle, Value, WriteBackend,
};
use sheetflow_csv::{CsvWorkbookReader, CsvWorkbookWriter};
use sheetflow_xlsx::{XlsxWorkbookReader, XlsxWorkbookWriter};

use crate::format::FileFormat;

/// Writer for an XLSX or CSV target
#[derive(Debug)]
pub enum FileWriter {
    Xlsx(XlsxWorkbookWriter),
    Csv(CsvWorkbookWriter),
}

impl FileWriter {
    /// Create a writer for `path`, choosing the format from the path
    ///
    /// Nothing is written until [`finalize`](WriteBackend::finalize).
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match FileFormat::detect(path)? {
            FileFormat::Xlsx => {
                if path
                    .extension()
                    .map_or(false, |e| e.eq_ignore_ascii_case("xlsm"))
                {
                    return Err(Error::other(format!(
                        "Cannot write macro-enabled workbook: {}",
                        path.display()
                    )));
                }
                Ok(FileWriter::Xlsx(XlsxWorkbookWriter::new(path)))
            }
            FileFormat::Csv => Ok(FileWriter::Csv(CsvWorkbookWriter::new(path))),
        }
    }

    pub fn format(&self) -> FileFormat {
        match self {
            FileWriter::Xlsx(_) => FileFormat::Xlsx,
            FileWriter::Csv(_) => FileFormat::Csv,
        }
    }
}

impl WriteBackend for FileWriter {
    type Persisted = PathBuf;

    fn create_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        match self {
            FileWriter::Xlsx(w) => w.create_sheet(name),
            FileWriter::Csv(w) => w.create_sheet(name),
        }
    }

    fn set_cell(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        value: &Value,
        dtype: LogicalType,
    ) -> Result<()> {
        match self {
            FileWriter::Xlsx(w) => w.set_cell(sheet, row, col, value, dtype),
            FileWriter::Csv(w) => w.set_cell(sheet, row, col, value, dtype),
        }
    }

    fn set_row(
        &mut self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        values: &[Value],
        dtype: LogicalType,
    ) -> Result<()> {
        match self {
            FileWriter::Xlsx(w) => w.set_row(sheet, row, col, values, dtype),
            FileWriter::Csv(w) => w.set_row(sheet, row, col, values, dtype),
        }
    }

    fn capacity(&self) -> Capacity {
        match self {
            FileWriter::Xlsx(w) => w.capacity(),
            FileWriter::Csv(w) => w.capacity(),
        }
    }

    fn finalize(self) -> Result<PathBuf> {
        match self {
            FileWriter::Xlsx(w) => w.finalize(),
            FileWriter::Csv(w) => w.finalize(),
        }
    }
}

/// Reader for an XLSX or CSV source
pub enum FileReader {
    Xlsx(XlsxWorkbookReader),
    Csv(CsvWorkbookReader),
}

impl FileReader {
    /// Open `path`, choosing the format from the path
    ///
    /// Failures to open or parse the source are reported as
    /// [`Error::Persistence`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match FileFormat::detect(path)? {
            FileFormat::Xlsx => XlsxWorkbookReader::open(path)
                .map(FileReader::Xlsx)
                .map_err(|e| e.into_core(path)),
            FileFormat::Csv => CsvWorkbookReader::open(path)
                .map(FileReader::Csv)
                .map_err(|e| e.into_core(path)),
        }
    }

    pub fn format(&self) -> FileFormat {
        match self {
            FileReader::Xlsx(_) => FileFormat::Xlsx,
            FileReader::Csv(_) => FileFormat::Csv,
        }
    }
}

impl ReadBackend for FileReader {
    fn sheet_names(&self) -> Vec<String> {
        match self {
            FileReader::Xlsx(r) => r.sheet_names(),
            FileReader::Csv(r) => r.sheet_names(),
        }
    }

    fn open_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        match self {
            FileReader::Xlsx(r) => r.open_sheet(name),
            FileReader::Csv(r) => r.open_sheet(name),
        }
    }

    fn get_cell(
        &self,
        sheet: SheetHandle,
        row: u32,
        col: u32,
        dtype: LogicalType,
    ) -> Result<Value> {
        match self {
            FileReader::Xlsx(r) => r.get_cell(sheet, row, col, dtype),
            FileReader::Csv(r) => r.get_cell(sheet, row, col, dtype),
        }
    }

    fn capacity(&self) -> Capacity {
        match self {
            FileReader::Xlsx(r) => r.capacity(),
            FileReader::Csv(r) => r.capacity(),
        }
    }
}
