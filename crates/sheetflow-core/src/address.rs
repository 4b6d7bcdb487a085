//! Zero-based cell positions and A1-style addressing

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A zero-based (row, column) cell position
///
/// Backends may translate to 1-based addressing internally; the A1 helpers
/// here follow spreadsheet conventions (`A1` is `(0, 0)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ...)
    pub col: u32,
}

impl Position {
    /// Create a new position
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Create a position from signed coordinates, rejecting negative values
    pub fn checked(row: i64, col: i64) -> Result<Self> {
        let row = u32::try_from(row).map_err(|_| {
            Error::MalformedRange(format!("row {} is not a valid non-negative index", row))
        })?;
        let col = u32::try_from(col).map_err(|_| {
            Error::MalformedRange(format!("column {} is not a valid non-negative index", col))
        })?;
        Ok(Self { row, col })
    }

    /// Parse a cell address from A1-style notation
    ///
    /// `$` markers are accepted and ignored.
    ///
    /// # Examples
    /// ```
    /// use sheetflow_core::Position;
    ///
    /// let pos = Position::parse("A1").unwrap();
    /// assert_eq!((pos.row, pos.col), (0, 0));
    ///
    /// let pos = Position::parse("$AB$12").unwrap();
    /// assert_eq!((pos.row, pos.col), (11, 27));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = letters_to_column(&s[col_start..pos])?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        if !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{}'", s)));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        // A1 rows are 1-based
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        if row > MAX_ROWS {
            return Err(Error::InvalidAddress(format!(
                "row {} exceeds the maximum of {} in '{}'",
                row, MAX_ROWS, s
            )));
        }

        Ok(Self { row: row - 1, col })
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        let mut result = column_to_letters(self.col);
        result.push_str(&(u64::from(self.row) + 1).to_string());
        result
    }

    /// Offset this position, failing on overflow
    pub fn offset(&self, rows: u32, cols: u32) -> Option<Position> {
        Some(Position {
            row: self.row.checked_add(rows)?,
            col: self.col.checked_add(cols)?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<(u32, u32)> for Position {
    fn from((row, col): (u32, u32)) -> Self {
        Self { row, col }
    }
}

/// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn column_to_letters(col: u32) -> String {
    let mut result = Vec::new();
    let mut n = u64::from(col) + 1; // 1-based for calculation

    while n > 0 {
        n -= 1;
        result.push((n % 26) as u8 + b'A');
        n /= 26;
    }

    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidAddress("empty column letters".into()));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::InvalidAddress(format!(
                "invalid column letter '{}'",
                c
            )));
        }
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        if col > MAX_COLS {
            return Err(Error::InvalidAddress(format!(
                "column '{}' exceeds the maximum of {} columns",
                letters, MAX_COLS
            )));
        }
    }

    Ok(col - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(Position::parse("A1").unwrap(), Position::new(0, 0));
        assert_eq!(Position::parse("B3").unwrap(), Position::new(2, 1));
        assert_eq!(Position::parse("z10").unwrap(), Position::new(9, 25));
        assert_eq!(Position::parse("XFD1048576").unwrap(), Position::new(1_048_575, 16_383));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Position::parse("").is_err());
        assert!(Position::parse("A").is_err());
        assert!(Position::parse("12").is_err());
        assert!(Position::parse("A0").is_err());
        assert!(Position::parse("A1B").is_err());
        assert!(Position::parse("XFE1").is_err());
        assert!(Position::parse("A1048577").is_err());
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(25), "Z");
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(702), "AAA");
        assert_eq!(letters_to_column("AAA").unwrap(), 702);
        assert_eq!(letters_to_column("xfd").unwrap(), 16_383);
    }

    #[test]
    fn test_a1_string_roundtrip() {
        for (row, col) in [(0, 0), (9, 27), (99, 701), (1_048_575, 16_383)] {
            let pos = Position::new(row, col);
            assert_eq!(Position::parse(&pos.to_a1_string()).unwrap(), pos);
        }
    }

    #[test]
    fn test_checked_rejects_negative() {
        assert!(matches!(
            Position::checked(-1, 0),
            Err(Error::MalformedRange(_))
        ));
        assert!(matches!(
            Position::checked(0, -3),
            Err(Error::MalformedRange(_))
        ));
        assert_eq!(Position::checked(4, 2).unwrap(), Position::new(4, 2));
    }
}
