//! Shape descriptors

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Geometry of a data region anchored at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// Exactly the anchor cell
    Scalar,
    /// `n` consecutive cells rightward from the anchor
    Row(u32),
    /// `n` consecutive cells downward from the anchor
    Column(u32),
    /// `rows x cols` block with the anchor at its top-left
    Matrix(u32, u32),
}

impl Shape {
    /// The shape as (n_rows, n_cols)
    pub fn dims(&self) -> (u32, u32) {
        match *self {
            Shape::Scalar => (1, 1),
            Shape::Row(n) => (1, n),
            Shape::Column(n) => (n, 1),
            Shape::Matrix(rows, cols) => (rows, cols),
        }
    }

    /// Total number of cells covered
    pub fn cell_count(&self) -> u64 {
        let (rows, cols) = self.dims();
        u64::from(rows) * u64::from(cols)
    }

    /// Reject zero-sized variants
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            Shape::Scalar => true,
            Shape::Row(n) | Shape::Column(n) => n >= 1,
            Shape::Matrix(rows, cols) => rows >= 1 && cols >= 1,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::MalformedRange(format!(
                "{} has a zero-sized dimension",
                self
            )))
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "Scalar"),
            Shape::Row(n) => write!(f, "Row({})", n),
            Shape::Column(n) => write!(f, "Column({})", n),
            Shape::Matrix(rows, cols) => write!(f, "Matrix({}, {})", rows, cols),
        }
    }
}

/// Parses `scalar`, `row:N`, `col:N` / `column:N` and `matrix:RxC`
impl FromStr for Shape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        let invalid = || Error::other(format!("invalid shape '{}'", s));
        let parse_n = |n: &str| n.trim().parse::<u32>().map_err(|_| invalid());

        let shape = match s.split_once(':') {
            None if s == "scalar" => Shape::Scalar,
            Some(("row", n)) => Shape::Row(parse_n(n)?),
            Some(("col", n)) | Some(("column", n)) => Shape::Column(parse_n(n)?),
            Some(("matrix", dims)) => {
                let (rows, cols) = dims.split_once('x').ok_or_else(invalid)?;
                Shape::Matrix(parse_n(rows)?, parse_n(cols)?)
            }
            _ => return Err(invalid()),
        };
        shape.validate()?;
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims() {
        assert_eq!(Shape::Scalar.dims(), (1, 1));
        assert_eq!(Shape::Row(5).dims(), (1, 5));
        assert_eq!(Shape::Column(5).dims(), (5, 1));
        assert_eq!(Shape::Matrix(4, 3).dims(), (4, 3));
        assert_eq!(Shape::Matrix(4, 3).cell_count(), 12);
    }

    #[test]
    fn test_validate() {
        assert!(Shape::Scalar.validate().is_ok());
        assert!(Shape::Row(1).validate().is_ok());
        for bad in [
            Shape::Row(0),
            Shape::Column(0),
            Shape::Matrix(0, 3),
            Shape::Matrix(3, 0),
        ] {
            assert!(matches!(bad.validate(), Err(Error::MalformedRange(_))), "{bad}");
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("scalar".parse::<Shape>().unwrap(), Shape::Scalar);
        assert_eq!("row:5".parse::<Shape>().unwrap(), Shape::Row(5));
        assert_eq!("COL:2".parse::<Shape>().unwrap(), Shape::Column(2));
        assert_eq!("matrix:2x3".parse::<Shape>().unwrap(), Shape::Matrix(2, 3));
        assert!("row:0".parse::<Shape>().is_err());
        assert!("matrix:2".parse::<Shape>().is_err());
        assert!("blob".parse::<Shape>().is_err());
    }
}
