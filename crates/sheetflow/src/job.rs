//! Batch job descriptions
//!
//! Jobs are plain data. They are built up front, shared read-only with the
//! worker pool and never mutated while a batch runs, so one set of ranges
//! can serve as a template for many targets.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

use sheetflow_core::{find_sheet, Error, Payload, RangeSpec, Result};

/// Ranges to write into one sheet, in dispatch order
#[derive(Debug, Clone, PartialEq)]
pub struct SheetWrites {
    pub name: String,
    pub ranges: Vec<(RangeSpec, Payload)>,
}

impl SheetWrites {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ranges: Vec::new(),
        }
    }

    /// Append a range and its payload
    pub fn range(mut self, range: RangeSpec, payload: impl Into<Payload>) -> Self {
        self.ranges.push((range, payload.into()));
        self
    }
}

/// Everything written to one target
#[derive(Debug, Clone, PartialEq)]
pub struct WriteJob {
    /// Target identifier; for file backends, the output path
    pub target: String,
    pub sheets: Vec<SheetWrites>,
}

impl WriteJob {
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self {
            target: target.into(),
            sheets: Vec::new(),
        }
    }

    /// Add a sheet and its ranges
    pub fn sheet(mut self, sheet: SheetWrites) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Append one range to the named sheet, adding the sheet if needed
    pub fn range<S: Into<String>>(
        mut self,
        sheet: S,
        range: RangeSpec,
        payload: impl Into<Payload>,
    ) -> Self {
        let sheet = sheet.into();
        let payload = payload.into();
        match self.sheets.iter_mut().find(|s| s.name == sheet) {
            Some(existing) => existing.ranges.push((range, payload)),
            None => self.sheets.push(SheetWrites {
                name: sheet,
                ranges: vec![(range, payload)],
            }),
        }
        self
    }

    /// Total number of ranges across all sheets
    pub fn range_count(&self) -> usize {
        self.sheets.iter().map(|s| s.ranges.len()).sum()
    }
}

/// Names the sheet a read applies to
///
/// Names match ASCII case-insensitively; indices count from 0 in workbook
/// order. Both resolve against the source's sheet list when the job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Name(String),
    Index(usize),
}

impl SheetSelector {
    /// Workbook name of the selected sheet
    pub fn resolve(&self, names: &[String]) -> Result<String> {
        let index = match self {
            SheetSelector::Name(name) => find_sheet(names.iter().map(String::as_str), name),
            SheetSelector::Index(index) => Some(*index).filter(|&i| i < names.len()),
        };
        index
            .map(|i| names[i].clone())
            .ok_or_else(|| Error::SheetNotFound(self.to_string()))
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Name(name) => f.write_str(name),
            SheetSelector::Index(index) => write!(f, "#{}", index),
        }
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        SheetSelector::Name(name)
    }
}

impl From<&String> for SheetSelector {
    fn from(name: &String) -> Self {
        SheetSelector::Name(name.clone())
    }
}

impl From<usize> for SheetSelector {
    fn from(index: usize) -> Self {
        SheetSelector::Index(index)
    }
}

/// Ranges to read from one sheet
///
/// Keyed ranges come back in a map; unkeyed ranges come back as a list in
/// request order.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetReads {
    pub sheet: SheetSelector,
    pub keyed: Vec<(String, RangeSpec)>,
    pub ordered: Vec<RangeSpec>,
}

impl SheetReads {
    pub fn new(sheet: impl Into<SheetSelector>) -> Self {
        Self {
            sheet: sheet.into(),
            keyed: Vec::new(),
            ordered: Vec::new(),
        }
    }

    /// Request `range` under `key`
    pub fn range<K: Into<String>>(mut self, key: K, range: RangeSpec) -> Self {
        self.keyed.push((key.into(), range));
        self
    }

    /// Request an unkeyed range
    pub fn push(mut self, range: RangeSpec) -> Self {
        self.ordered.push(range);
        self
    }

    pub fn range_count(&self) -> usize {
        self.keyed.len() + self.ordered.len()
    }
}

/// Everything read from one source
#[derive(Debug, Clone, PartialEq)]
pub struct ReadJob {
    /// Source identifier; for file backends, the input path
    pub target: String,
    pub sheets: Vec<SheetReads>,
}

impl ReadJob {
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self {
            target: target.into(),
            sheets: Vec::new(),
        }
    }

    pub fn sheet(mut self, sheet: SheetReads) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Request one keyed range from the selected sheet
    pub fn range<K: Into<String>>(
        self,
        sheet: impl Into<SheetSelector>,
        key: K,
        range: RangeSpec,
    ) -> Self {
        let key = key.into();
        self.with_sheet(sheet.into(), |reads| reads.keyed.push((key, range)))
    }

    /// Request one unkeyed range from the selected sheet
    pub fn push(self, sheet: impl Into<SheetSelector>, range: RangeSpec) -> Self {
        self.with_sheet(sheet.into(), |reads| reads.ordered.push(range))
    }

    fn with_sheet(mut self, sheet: SheetSelector, add: impl FnOnce(&mut SheetReads)) -> Self {
        match self.sheets.iter_mut().find(|s| s.sheet == sheet) {
            Some(existing) => add(existing),
            None => {
                let mut reads = SheetReads::new(sheet);
                add(&mut reads);
                self.sheets.push(reads);
            }
        }
        self
    }

    pub fn range_count(&self) -> usize {
        self.sheets.iter().map(SheetReads::range_count).sum()
    }
}

/// Payloads read from one sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetPayloads {
    pub keyed: BTreeMap<String, Payload>,
    pub ordered: Vec<Payload>,
}

impl Index<&str> for SheetPayloads {
    type Output = Payload;

    fn index(&self, key: &str) -> &Payload {
        &self.keyed[key]
    }
}

impl Index<usize> for SheetPayloads {
    type Output = Payload;

    fn index(&self, index: usize) -> &Payload {
        &self.ordered[index]
    }
}
