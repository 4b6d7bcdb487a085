//! XLSX writer

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use log::debug;
use sheetflow_core::backend::find_sheet;
use sheetflow_core::{
    coerce_for_write, validate_sheet_name, Capacity, Error, LogicalType, Position, Result,
    SheetHandle, Value, WriteBackend,
};
use zip::write::SimpleFileOptions;

use crate::dates::{date_to_serial, datetime_to_serial};
use crate::error::{XlsxError, XlsxResult};
use crate::escape::{encode_excel_escapes, escape_xml};
use crate::styles::{styles_xml, XF_DATE, XF_DATETIME};

/// Buffered cells of one worksheet, keyed by row then column
#[derive(Debug, Default)]
struct SheetBuffer {
    name: String,
    rows: BTreeMap<u32, BTreeMap<u32, Value>>,
}

/// XLSX workbook writer
///
/// Cells may be set in any order; rows are buffered and emitted in
/// ascending row and column order on [`finalize`](WriteBackend::finalize),
/// which is what the worksheet format requires. Output is deterministic:
/// identical cell contents produce byte-identical files.
#[derive(Debug)]
pub struct XlsxWorkbookWriter {
    path: PathBuf,
    sheets: Vec<SheetBuffer>,
}

impl XlsxWorkbookWriter {
    /// Create a writer targeting the file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sheets: Vec::new(),
        }
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of sheets created so far
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Write the workbook to an arbitrary seekable writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> XlsxResult<()> {
        let mut zip = zip::ZipWriter::new(writer);

        Self::write_content_types(&mut zip, self.sheets.len())?;
        Self::write_root_rels(&mut zip)?;
        self.write_workbook_xml(&mut zip)?;
        Self::write_workbook_rels(&mut zip, self.sheets.len())?;
        Self::write_part(&mut zip, "xl/styles.xml", &styles_xml())?;

        for (i, sheet) in self.sheets.iter().enumerate() {
            Self::write_worksheet(&mut zip, i, sheet)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn file_options() -> SimpleFileOptions {
        // Fixed timestamp keeps the archive reproducible
        SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
    }

    fn write_part<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        name: &str,
        content: &str,
    ) -> XlsxResult<()> {
        zip.start_file(name, Self::file_options())?;
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_count: usize,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        for i in 0..sheet_count {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        content.push_str("\n</Types>");
        Self::write_part(zip, "[Content_Types].xml", &content)
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        Self::write_part(zip, "_rels/.rels", content)
    }

    fn write_workbook_xml<W: Write + Seek>(&self, zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        );

        for (i, sheet) in self.sheets.iter().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(&sheet.name),
                i + 1,
                i + 1
            ));
        }

        content.push_str(
            r#"
    </sheets>
</workbook>"#,
        );
        Self::write_part(zip, "xl/workbook.xml", &content)
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_count: usize,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..sheet_count {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
            sheet_count + 1
        ));
        Self::write_part(zip, "xl/_rels/workbook.xml.rels", &content)
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        index: usize,
        sheet: &SheetBuffer,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if let (Some(first), Some(last)) = (sheet.rows.keys().next(), sheet.rows.keys().next_back()) {
            let min_col = sheet
                .rows
                .values()
                .filter_map(|cells| cells.keys().next())
                .min()
                .copied()
                .unwrap_or(0);
            let max_col = sheet
                .rows
                .values()
                .filter_map(|cells| cells.keys().next_back())
                .max()
                .copied()
                .unwrap_or(0);
            content.push_str(&format!(
                "\n    <dimension ref=\"{}:{}\"/>",
                Position::new(*first, min_col),
                Position::new(*last, max_col)
            ));
        }

        content.push_str("\n    <sheetData>");
        for (&row, cells) in &sheet.rows {
            content.push_str(&format!("\n        <row r=\"{}\">", u64::from(row) + 1));
            for (&col, value) in cells {
                Self::write_cell(&mut content, row, col, value)?;
            }
            content.push_str("\n        </row>");
        }
        content.push_str("\n    </sheetData>\n</worksheet>");

        Self::write_part(zip, &format!("xl/worksheets/sheet{}.xml", index + 1), &content)
    }

    fn write_cell(content: &mut String, row: u32, col: u32, value: &Value) -> XlsxResult<()> {
        let cell_ref = Position::new(row, col).to_a1_string();
        match value {
            Value::Empty => {}
            Value::Int(n) => {
                content.push_str(&format!("\n            <c r=\"{}\"><v>{}</v></c>", cell_ref, n));
            }
            Value::Float(n) => {
                // Debug keeps a trailing `.0` so integral floats read back as floats
                content.push_str(&format!(
                    "\n            <c r=\"{}\"><v>{:?}</v></c>",
                    cell_ref, n
                ));
            }
            Value::Str(s) => {
                let text = escape_xml(&encode_excel_escapes(s));
                let space = if s.trim() != s { " xml:space=\"preserve\"" } else { "" };
                content.push_str(&format!(
                    "\n            <c r=\"{}\" t=\"inlineStr\"><is><t{}>{}</t></is></c>",
                    cell_ref, space, text
                ));
            }
            Value::Bool(b) => {
                content.push_str(&format!(
                    "\n            <c r=\"{}\" t=\"b\"><v>{}</v></c>",
                    cell_ref,
                    if *b { 1 } else { 0 }
                ));
            }
            Value::Date(d) => {
                let serial = date_to_serial(*d).ok_or_else(|| {
                    XlsxError::Parse(format!("{} precedes the 1900 date system", d))
                })?;
                content.push_str(&format!(
                    "\n            <c r=\"{}\" s=\"{}\"><v>{}</v></c>",
                    cell_ref, XF_DATE, serial
                ));
            }
            Value::DateTime(dt) => {
                let serial = datetime_to_serial(*dt).ok_or_else(|| {
                    XlsxError::Parse(format!("{} precedes the 1900 date system", dt))
                })?;
                content.push_str(&format!(
                    "\n            <c r=\"{}\" s=\"{}\"><v>{}</v></c>",
                    cell_ref, XF_DATETIME, serial
                ));
            }
        }
        Ok(())
    }

    fn persist(&self) -> XlsxResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        if let Err(e) = self.write_to(&mut writer).and_then(|_| Ok(writer.flush()?)) {
            drop(writer);
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        drop(writer);
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Reject values the file format cannot represent
fn check_representable(value: &Value, dtype: LogicalType, row: u32, col: u32) -> Result<()> {
    let representable = match value {
        Value::Float(n) => n.is_finite(),
        Value::Date(d) => date_to_serial(*d).is_some(),
        Value::DateTime(dt) => datetime_to_serial(*dt).is_some(),
        _ => true,
    };
    if representable {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            row,
            col,
            expected: dtype,
            found: format!("{} {} (not representable in XLSX)", value.type_name(), value),
        })
    }
}

impl WriteBackend for XlsxWorkbookWriter {
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
        Capacity::EXCEL.check(row, col)?;
        let value = coerce_for_write(value, dtype, row, col)?;
        check_representable(&value, dtype, row, col)?;

        let buffer = self
            .sheets
            .get_mut(sheet.index())
            .ok_or_else(|| Error::SheetNotFound(format!("handle {}", sheet.index())))?;
        if value.is_empty() {
            if let Some(cells) = buffer.rows.get_mut(&row) {
                cells.remove(&col);
                if cells.is_empty() {
                    buffer.rows.remove(&row);
                }
            }
        } else {
            buffer.rows.entry(row).or_default().insert(col, value);
        }
        Ok(())
    }

    fn capacity(&self) -> Capacity {
        Capacity::EXCEL
    }

    fn finalize(self) -> Result<PathBuf> {
        if self.sheets.is_empty() {
            return Err(Error::persistence(
                self.path.display().to_string(),
                "a workbook needs at least one sheet",
            ));
        }
        self.persist().map_err(|e| e.into_core(&self.path))?;
        debug!(
            "finalized {} ({} sheets)",
            self.path.display(),
            self.sheets.len()
        );
        Ok(self.path)
    }
}
