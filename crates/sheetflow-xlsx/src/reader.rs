//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use sheetflow_core::backend::find_sheet;
use sheetflow_core::value::float_to_int;
use sheetflow_core::{
    coerce_for_read, Capacity, Error, LogicalType, Position, ReadBackend, Result, SheetHandle,
    Value,
};

use crate::dates::{serial_to_date, serial_to_datetime};
use crate::error::{XlsxError, XlsxResult};
use crate::escape::decode_excel_escapes;
use crate::styles::{read_number_kinds, NumberKind};

/// Stored content of one cell, before any logical type is applied
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    /// Number as written in the file, with the display kind of its style
    Number { text: String, kind: NumberKind },
    Text(String),
    Bool(bool),
    /// Error literal such as `#DIV/0!`
    Error(String),
}

type SheetCells = HashMap<(u32, u32), RawCell>;

#[derive(Debug)]
struct SheetEntry {
    name: String,
    part: String,
    cells: Option<SheetCells>,
}

/// XLSX workbook reader
///
/// Shared strings, styles and the sheet list are read on open. A worksheet
/// is parsed in full the first time [`open_sheet`](ReadBackend::open_sheet)
/// names it; cell reads are then served from memory.
pub struct XlsxWorkbookReader<R = BufReader<File>> {
    archive: zip::ZipArchive<R>,
    shared_strings: Vec<String>,
    number_kinds: Vec<NumberKind>,
    sheets: Vec<SheetEntry>,
}

impl XlsxWorkbookReader<BufReader<File>> {
    /// Open a workbook from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let file = File::open(path.as_ref())?;
        let reader = Self::from_reader(BufReader::new(file))?;
        debug!(
            "opened {} ({} sheets)",
            path.as_ref().display(),
            reader.sheets.len()
        );
        Ok(reader)
    }
}

impl<R: Read + Seek> XlsxWorkbookReader<R> {
    /// Open a workbook from any seekable source
    pub fn from_reader(reader: R) -> XlsxResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let number_kinds = match archive.by_name("xl/styles.xml") {
            Ok(file) => read_number_kinds(file)?,
            Err(_) => Vec::new(),
        };
        let sheet_info = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut sheets = Vec::new();
        for (name, r_id) in sheet_info {
            match sheet_paths.get(&r_id) {
                Some(part) => sheets.push(SheetEntry {
                    name,
                    part: part.clone(),
                    cells: None,
                }),
                None => warn!("sheet '{}' has no worksheet relationship {}", name, r_id),
            }
        }

        Ok(Self {
            archive,
            shared_strings,
            number_kinds,
            sheets,
        })
    }

    /// Read the shared strings table
    fn read_shared_strings(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        // Leading and trailing spaces are significant in cell text
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        current.clear();
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    current.push_str(&e.unescape()?);
                }
                Ok(Event::CData(e)) if in_t => {
                    current.push_str(&String::from_utf8_lossy(&e));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read workbook.xml to get sheet names and rIds
    fn read_workbook_xml(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let mut name = None;
                    let mut r_id = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"r:id" => {
                                r_id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels to get sheet part paths
    fn read_workbook_rels(archive: &mut zip::ZipArchive<R>) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"Target" => {
                                target = attr.unescape_value().ok().map(|s| s.to_string())
                            }
                            b"Type" => {
                                rel_type = attr.unescape_value().ok().map(|s| s.to_string())
                            }
                            _ => {}
                        }
                    }

                    // Only worksheet relationships matter
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to the xl/ folder
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Parse every cell of a worksheet part
    fn read_worksheet(&mut self, part: &str) -> XlsxResult<SheetCells> {
        let shared_strings = &self.shared_strings;
        let number_kinds = &self.number_kinds;
        let file = self
            .archive
            .by_name(part)
            .map_err(|_| XlsxError::MissingPart(part.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut cells = SheetCells::new();

        // Row/column of the current cell; cells without `r` follow their predecessor
        let mut row: u32 = 0;
        let mut next_row: u32 = 0;
        let mut col: u32 = 0;
        let mut next_col: u32 = 0;

        let mut cell_type: Option<String> = None;
        let mut cell_style: usize = 0;
        let mut value: Option<String> = None;
        let mut inline = String::new();
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_inline_text = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"row" => {
                        row = next_row;
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"r" {
                                if let Some(r) = attr
                                    .unescape_value()
                                    .ok()
                                    .and_then(|s| s.parse::<u32>().ok())
                                {
                                    row = r.saturating_sub(1); // 1-based to 0-based
                                }
                            }
                        }
                        next_row = row.saturating_add(1);
                        next_col = 0;
                    }
                    b"c" => {
                        in_cell = true;
                        col = next_col;
                        cell_type = None;
                        cell_style = 0;
                        value = None;
                        inline.clear();

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => {
                                    let cell_ref = attr.unescape_value()?;
                                    let pos = Position::parse(&cell_ref).map_err(|e| {
                                        XlsxError::Parse(format!(
                                            "Invalid cell reference '{}': {}",
                                            cell_ref, e
                                        ))
                                    })?;
                                    row = pos.row;
                                    col = pos.col;
                                }
                                b"t" => {
                                    cell_type = attr.unescape_value().ok().map(|s| s.to_string());
                                }
                                b"s" => {
                                    cell_style = attr
                                        .unescape_value()
                                        .ok()
                                        .and_then(|s| s.parse::<usize>().ok())
                                        .unwrap_or(0);
                                }
                                _ => {}
                            }
                        }
                        next_col = col.saturating_add(1);
                    }
                    b"v" if in_cell => in_value = true,
                    b"rPh" => in_phonetic = true,
                    b"t" if in_cell && !in_phonetic => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"c" => {
                    // Style-only cell; keep column tracking in step
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"r" {
                            if let Some(pos) = attr
                                .unescape_value()
                                .ok()
                                .and_then(|s| Position::parse(&s).ok())
                            {
                                next_col = pos.col;
                            }
                        }
                    }
                    next_col = next_col.saturating_add(1);
                }
                Ok(Event::Text(e)) if in_value => {
                    value
                        .get_or_insert_with(String::new)
                        .push_str(&e.unescape()?);
                }
                Ok(Event::Text(e)) if in_inline_text => {
                    inline.push_str(&e.unescape()?);
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"v" => in_value = false,
                    b"t" => in_inline_text = false,
                    b"rPh" => in_phonetic = false,
                    b"c" => {
                        in_cell = false;
                        let raw = raw_cell(
                            cell_type.as_deref(),
                            value.as_deref(),
                            &inline,
                            number_kinds.get(cell_style).copied().unwrap_or_default(),
                            shared_strings,
                        )?;
                        if let Some(raw) = raw {
                            cells.insert((row, col), raw);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(cells)
    }
}

/// Classify a parsed `<c>` element; `None` for cells without content
fn raw_cell(
    cell_type: Option<&str>,
    value: Option<&str>,
    inline: &str,
    kind: NumberKind,
    shared_strings: &[String],
) -> XlsxResult<Option<RawCell>> {
    let raw = match (cell_type, value) {
        (Some("inlineStr"), _) => RawCell::Text(decode_excel_escapes(inline)),
        (_, None) => return Ok(None),
        (Some("s"), Some(v)) => {
            let idx: usize = v
                .trim()
                .parse()
                .map_err(|_| XlsxError::Parse(format!("Invalid shared string index: {}", v)))?;
            let s = shared_strings.get(idx).ok_or_else(|| {
                XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
            })?;
            RawCell::Text(s.clone())
        }
        (Some("b"), Some(v)) => {
            let v = v.trim();
            RawCell::Bool(v == "1" || v.eq_ignore_ascii_case("true"))
        }
        (Some("e"), Some(v)) => RawCell::Error(v.to_string()),
        (Some("str"), Some(v)) => RawCell::Text(decode_excel_escapes(v)),
        (None, Some(v)) | (Some("n"), Some(v)) => RawCell::Number {
            text: v.trim().to_string(),
            kind,
        },
        (Some(other), Some(v)) => {
            warn!("unknown cell type '{}', reading as text", other);
            RawCell::Text(v.to_string())
        }
    };
    Ok(Some(raw))
}

/// Convert a stored number to the value a reader asked for
fn number_value(text: &str, kind: NumberKind, dtype: LogicalType) -> Value {
    let float = text.parse::<f64>().ok();
    let as_date = || {
        float
            .and_then(float_to_int)
            .and_then(serial_to_date)
            .map(Value::Date)
    };
    let as_datetime = || float.and_then(serial_to_datetime).map(Value::DateTime);

    let converted = match dtype {
        LogicalType::Int => text.parse::<i64>().ok().map(Value::Int),
        LogicalType::Date => as_date().or_else(as_datetime),
        LogicalType::DateTime => as_datetime(),
        LogicalType::Any => match kind {
            NumberKind::Date => as_date().or_else(as_datetime),
            NumberKind::DateTime => as_datetime(),
            NumberKind::General => text.parse::<i64>().ok().map(Value::Int),
        },
        _ => None,
    };
    converted
        .or_else(|| float.map(Value::Float))
        .unwrap_or_else(|| Value::string(text))
}

impl<R: Read + Seek + Send> ReadBackend for XlsxWorkbookReader<R> {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn open_sheet(&mut self, name: &str) -> Result<SheetHandle> {
        let index = find_sheet(self.sheets.iter().map(|s| s.name.as_str()), name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;

        if self.sheets[index].cells.is_none() {
            let part = self.sheets[index].part.clone();
            let cells = self
                .read_worksheet(&part)
                .map_err(|e| e.into_core(Path::new(&part)))?;
            debug!("loaded sheet '{}' ({} cells)", name, cells.len());
            self.sheets[index].cells = Some(cells);
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
        Capacity::EXCEL.check(row, col)?;
        let entry = self
            .sheets
            .get(sheet.index())
            .ok_or_else(|| Error::SheetNotFound(format!("handle {}", sheet.index())))?;
        let cells = entry
            .cells
            .as_ref()
            .ok_or_else(|| Error::SheetNotFound(format!("{} is not open", entry.name)))?;

        let stored = match cells.get(&(row, col)) {
            None => Value::Empty,
            Some(RawCell::Number { text, kind }) => number_value(text, *kind, dtype),
            Some(RawCell::Text(s)) => Value::string(s.as_str()),
            Some(RawCell::Bool(b)) => Value::Bool(*b),
            Some(RawCell::Error(e)) => match dtype {
                LogicalType::Any | LogicalType::Str => Value::string(e.as_str()),
                _ => {
                    return Err(Error::TypeMismatch {
                        row,
                        col,
                        expected: dtype,
                        found: format!("error {}", e),
                    })
                }
            },
        };
        coerce_for_read(&stored, dtype, row, col)
    }

    fn capacity(&self) -> Capacity {
        Capacity::EXCEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_number_value() {
        use LogicalType::*;
        assert_eq!(number_value("3", NumberKind::General, Any), Value::Int(3));
        assert_eq!(number_value("3.0", NumberKind::General, Any), Value::Float(3.0));
        assert_eq!(number_value("3", NumberKind::General, Float), Value::Float(3.0));
        assert_eq!(
            number_value("9007199254740993", NumberKind::General, Int),
            Value::Int(9_007_199_254_740_993)
        );
        assert_eq!(
            number_value("45363", NumberKind::Date, Any),
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 12).unwrap())
        );
        assert_eq!(
            number_value("45363.5", NumberKind::General, DateTime),
            Value::DateTime(
                NaiveDate::from_ymd_opt(2024, 3, 12)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            )
        );
    }
}
