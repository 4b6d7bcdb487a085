//! Cell styles
//!
//! The writer emits a fixed style sheet: xf 0 is General, xf 1 is the
//! built-in date format and xf 2 the built-in date-time format. The reader
//! only needs to know which cell formats display dates, so it classifies
//! every `cellXfs` entry by its number format.

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};

/// Built-in number format `m/d/yyyy`
pub(crate) const NUMFMT_DATE: u32 = 14;
/// Built-in number format `m/d/yyyy h:mm`
pub(crate) const NUMFMT_DATETIME: u32 = 22;

/// xf index for date cells in the writer's style sheet
pub(crate) const XF_DATE: u32 = 1;
/// xf index for date-time cells in the writer's style sheet
pub(crate) const XF_DATETIME: u32 = 2;

/// How a cell format displays numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum NumberKind {
    #[default]
    General,
    Date,
    DateTime,
}

pub(crate) fn styles_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="3">
        <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
        <xf numFmtId="{}" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
        <xf numFmtId="{}" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    </cellXfs>
    <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#,
        NUMFMT_DATE, NUMFMT_DATETIME
    )
}

fn builtin_kind(id: u32) -> NumberKind {
    match id {
        14..=17 => NumberKind::Date,
        18..=22 | 45..=47 => NumberKind::DateTime,
        _ => NumberKind::General,
    }
}

/// Classify a custom format code such as `yyyy-mm-dd hh:mm`
fn custom_kind(code: &str) -> NumberKind {
    let mut has_date = false;
    let mut has_time = false;
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    // Only the first (positive) section matters
    for c in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            ';' if !in_quotes => break,
            _ if in_quotes || in_brackets => {}
            'y' | 'Y' | 'd' | 'D' => has_date = true,
            'h' | 'H' | 's' | 'S' => has_time = true,
            _ => {}
        }
    }

    match (has_date, has_time) {
        (true, true) | (false, true) => NumberKind::DateTime,
        (true, false) => NumberKind::Date,
        (false, false) => NumberKind::General,
    }
}

/// Read `xl/styles.xml` and classify each `cellXfs` entry
pub(crate) fn read_number_kinds<R: Read>(source: R) -> XlsxResult<Vec<NumberKind>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(source));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut custom: HashMap<u32, NumberKind> = HashMap::new();
    let mut kinds = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let mut id = None;
                    let mut code = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => {
                                id = attr
                                    .unescape_value()
                                    .ok()
                                    .and_then(|s| s.parse::<u32>().ok());
                            }
                            b"formatCode" => {
                                code = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(code)) = (id, code) {
                        custom.insert(id, custom_kind(&code));
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let mut id = 0;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"numFmtId" {
                            id = attr
                                .unescape_value()
                                .ok()
                                .and_then(|s| s.parse::<u32>().ok())
                                .unwrap_or(0);
                        }
                    }
                    let kind = custom.get(&id).copied().unwrap_or_else(|| builtin_kind(id));
                    kinds.push(kind);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(kinds)
}
