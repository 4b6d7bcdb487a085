//! Range descriptors
//!
//! A [`RangeSpec`] binds an anchor [`Position`], a [`Shape`] and a
//! [`LogicalType`] into one addressable transfer unit. It is plain `Copy`
//! data and can be shared freely between jobs and threads.

use crate::address::Position;
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::value::LogicalType;

/// Anchor + shape + logical type describing one data region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RangeSpec {
    start: Position,
    shape: Shape,
    dtype: LogicalType,
    strict: bool,
}

impl RangeSpec {
    /// Create a range from signed coordinates
    ///
    /// Fails with [`Error::MalformedRange`] for negative coordinates,
    /// zero-sized shapes, or an extent that does not fit in `u32`.
    pub fn new(row: i64, col: i64, shape: Shape, dtype: LogicalType) -> Result<Self> {
        Self::from_position(Position::checked(row, col)?, shape, dtype)
    }

    /// Create a range anchored at an A1-style address
    pub fn at(address: &str, shape: Shape, dtype: LogicalType) -> Result<Self> {
        Self::from_position(Position::parse(address)?, shape, dtype)
    }

    /// Create a range anchored at `start`
    pub fn from_position(start: Position, shape: Shape, dtype: LogicalType) -> Result<Self> {
        shape.validate()?;
        let (rows, cols) = shape.dims();
        if start.offset(rows, cols).is_none() {
            return Err(Error::MalformedRange(format!(
                "{} at {} overflows the addressable grid",
                shape, start
            )));
        }
        Ok(Self {
            start,
            shape,
            dtype,
            strict: true,
        })
    }

    /// Shorthand for a single cell
    pub fn scalar(row: i64, col: i64, dtype: LogicalType) -> Result<Self> {
        Self::new(row, col, Shape::Scalar, dtype)
    }

    /// Substitute default values instead of failing on uncoercible cells when read
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Set strict type checking for reads
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// The 0-based anchor (top-left) position
    pub fn start(&self) -> Position {
        self.start
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn dtype(&self) -> LogicalType {
        self.dtype
    }

    /// Whether reads fail on uncoercible cells
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The range size as (n_rows, n_cols)
    pub fn dims(&self) -> (u32, u32) {
        self.shape.dims()
    }

    /// Number of cells covered
    pub fn cell_count(&self) -> u64 {
        self.shape.cell_count()
    }

    /// Exclusive (end_row, end_col) bound
    ///
    /// Used to pre-size materialized storage before a write.
    pub fn extent(&self) -> (u32, u32) {
        let (rows, cols) = self.dims();
        // Construction guarantees this fits.
        (self.start.row + rows, self.start.col + cols)
    }

    /// The 0-based inclusive bottom-right position
    pub fn end(&self) -> Position {
        let (end_row, end_col) = self.extent();
        Position::new(end_row - 1, end_col - 1)
    }

    /// Check whether `pos` lies within `[start, extent)`
    pub fn contains(&self, pos: Position) -> bool {
        let (end_row, end_col) = self.extent();
        pos.row >= self.start.row && pos.row < end_row && pos.col >= self.start.col && pos.col < end_col
    }

    /// Iterate the covered positions in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        let (end_row, end_col) = self.extent();
        let start = self.start;
        (start.row..end_row).flat_map(move |row| (start.col..end_col).map(move |col| Position::new(row, col)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extent_per_shape() {
        let cases = [
            (Shape::Scalar, (3, 5)),
            (Shape::Row(4), (3, 8)),
            (Shape::Column(4), (6, 5)),
            (Shape::Matrix(2, 3), (4, 7)),
        ];
        for (shape, expected) in cases {
            let range = RangeSpec::new(2, 4, shape, LogicalType::Any).unwrap();
            assert_eq!(range.extent(), expected, "{shape}");
        }
    }

    #[test]
    fn test_start_end() {
        let range = RangeSpec::at("B2", Shape::Matrix(3, 2), LogicalType::Int).unwrap();
        assert_eq!(range.start(), Position::new(1, 1));
        assert_eq!(range.end(), Position::new(3, 2));
        assert_eq!(range.end().to_a1_string(), "C4");
    }

    #[test]
    fn test_malformed() {
        for shape in [
            Shape::Row(0),
            Shape::Column(0),
            Shape::Matrix(0, 3),
            Shape::Matrix(3, 0),
        ] {
            assert!(matches!(
                RangeSpec::new(0, 0, shape, LogicalType::Int),
                Err(Error::MalformedRange(_))
            ));
        }
        assert!(matches!(
            RangeSpec::new(-1, 0, Shape::Scalar, LogicalType::Int),
            Err(Error::MalformedRange(_))
        ));
        assert!(matches!(
            RangeSpec::new(0, -1, Shape::Row(2), LogicalType::Int),
            Err(Error::MalformedRange(_))
        ));
        assert!(matches!(
            RangeSpec::new(i64::from(u32::MAX), 0, Shape::Column(2), LogicalType::Int),
            Err(Error::MalformedRange(_))
        ));
    }

    #[test]
    fn test_cells_row_major() {
        let range = RangeSpec::new(1, 1, Shape::Matrix(2, 2), LogicalType::Any).unwrap();
        let cells: Vec<_> = range.cells().map(|p| (p.row, p.col)).collect();
        assert_eq!(cells, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
        assert!(range.contains(Position::new(2, 2)));
        assert!(!range.contains(Position::new(3, 1)));
    }

    #[test]
    fn test_strict_flag() {
        let range = RangeSpec::scalar(0, 0, LogicalType::Float).unwrap();
        assert!(range.is_strict());
        assert!(!range.lenient().is_strict());
        assert!(range.lenient().with_strict(true).is_strict());
    }
}
