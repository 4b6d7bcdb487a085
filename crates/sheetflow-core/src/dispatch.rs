//! Range dispatch
//!
//! Translates one shaped [`RangeSpec`] + [`Payload`] into a deterministic
//! sequence of cell-level backend calls. Every cell is visited in row-major
//! order: rows ascending, and within a row columns ascending.
//!
//! Validation happens up front. A payload with the wrong arity, or a range
//! whose extent exceeds the backend capacity, fails before the backend sees
//! a single call.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::trace;

use crate::backend::{ReadBackend, SheetHandle, WriteBackend};
use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::range::RangeSpec;
use crate::shape::Shape;
use crate::value::Value;

/// Write `payload` into the cells covered by `range`, one call per cell
pub fn write_range<B>(
    backend: &mut B,
    sheet: SheetHandle,
    range: &RangeSpec,
    payload: &Payload,
) -> Result<()>
where
    B: WriteBackend + ?Sized,
{
    precheck_write(backend, range, payload)?;

    let start = range.start();
    let dtype = range.dtype();
    match (range.shape(), payload) {
        (Shape::Scalar, Payload::Scalar(value)) => {
            backend.set_cell(sheet, start.row, start.col, value, dtype)
        }
        (Shape::Row(_), Payload::Vector(values)) => {
            for (value, col) in values.iter().zip(start.col..) {
                backend.set_cell(sheet, start.row, col, value, dtype)?;
            }
            Ok(())
        }
        (Shape::Column(_), Payload::Vector(values)) => {
            for (value, row) in values.iter().zip(start.row..) {
                backend.set_cell(sheet, row, start.col, value, dtype)?;
            }
            Ok(())
        }
        (Shape::Matrix(_, _), Payload::Matrix(rows)) => {
            for (values, row) in rows.iter().zip(start.row..) {
                for (value, col) in values.iter().zip(start.col..) {
                    backend.set_cell(sheet, row, col, value, dtype)?;
                }
            }
            Ok(())
        }
        // check_arity rejects every other pairing
        (shape, payload) => Err(arity_error(shape, payload)),
    }
}

/// Write `payload` into `range`, using [`WriteBackend::set_row`] for
/// horizontal runs
///
/// The resulting cell contents are identical to [`write_range`].
pub fn write_range_bulk<B>(
    backend: &mut B,
    sheet: SheetHandle,
    range: &RangeSpec,
    payload: &Payload,
) -> Result<()>
where
    B: WriteBackend + ?Sized,
{
    precheck_write(backend, range, payload)?;

    let start = range.start();
    let dtype = range.dtype();
    match (range.shape(), payload) {
        (Shape::Row(_), Payload::Vector(values)) => {
            backend.set_row(sheet, start.row, start.col, values, dtype)
        }
        (Shape::Matrix(_, _), Payload::Matrix(rows)) => {
            for (values, row) in rows.iter().zip(start.row..) {
                backend.set_row(sheet, row, start.col, values, dtype)?;
            }
            Ok(())
        }
        _ => write_range(backend, sheet, range, payload),
    }
}

fn precheck_write<B>(backend: &B, range: &RangeSpec, payload: &Payload) -> Result<()>
where
    B: WriteBackend + ?Sized,
{
    payload.check_arity(&range.shape())?;
    let (end_row, end_col) = range.extent();
    backend.capacity().check_extent(end_row, end_col)?;
    trace!(
        "write {} {} at {} ({} cells)",
        range.shape(),
        range.dtype(),
        range.start(),
        range.cell_count()
    );
    Ok(())
}

fn arity_error(shape: Shape, payload: &Payload) -> Error {
    match payload.check_arity(&shape) {
        Err(e) => e,
        Ok(()) => Error::other(format!("unsupported payload for {}", shape)),
    }
}

/// Read the cells covered by `range` into a payload of matching arity
///
/// Strict ranges propagate [`Error::TypeMismatch`]; lenient ranges
/// substitute the logical type's default value for uncoercible cells.
pub fn read_range<B>(backend: &B, sheet: SheetHandle, range: &RangeSpec) -> Result<Payload>
where
    B: ReadBackend + ?Sized,
{
    let (end_row, end_col) = range.extent();
    backend.capacity().check_extent(end_row, end_col)?;
    trace!(
        "read {} {} at {} ({} cells)",
        range.shape(),
        range.dtype(),
        range.start(),
        range.cell_count()
    );

    let start = range.start();
    let payload = match range.shape() {
        Shape::Scalar => Payload::Scalar(read_cell(backend, sheet, range, start.row, start.col)?),
        Shape::Row(_) => Payload::Vector(
            (start.col..end_col)
                .map(|col| read_cell(backend, sheet, range, start.row, col))
                .collect::<Result<_>>()?,
        ),
        Shape::Column(_) => Payload::Vector(
            (start.row..end_row)
                .map(|row| read_cell(backend, sheet, range, row, start.col))
                .collect::<Result<_>>()?,
        ),
        Shape::Matrix(_, _) => Payload::Matrix(
            (start.row..end_row)
                .map(|row| {
                    (start.col..end_col)
                        .map(|col| read_cell(backend, sheet, range, row, col))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<_>>()?,
        ),
    };
    Ok(payload)
}

fn read_cell<B>(backend: &B, sheet: SheetHandle, range: &RangeSpec, row: u32, col: u32) -> Result<Value>
where
    B: ReadBackend + ?Sized,
{
    match backend.get_cell(sheet, row, col, range.dtype()) {
        Err(Error::TypeMismatch { .. }) if !range.is_strict() => Ok(range.dtype().default_value()),
        other => other,
    }
}

/// Read several keyed ranges from one sheet
///
/// A key that appears twice is rejected before any cell is read. Fails on
/// the first range that fails.
pub fn read_keyed<B, K>(
    backend: &B,
    sheet: SheetHandle,
    ranges: &[(K, RangeSpec)],
) -> Result<BTreeMap<K, Payload>>
where
    B: ReadBackend + ?Sized,
    K: Ord + Clone + fmt::Debug,
{
    let mut seen = BTreeSet::new();
    if let Some((key, _)) = ranges.iter().find(|(key, _)| !seen.insert(key)) {
        return Err(Error::other(format!("duplicate range key {:?}", key)));
    }

    ranges
        .iter()
        .map(|(key, range)| Ok((key.clone(), read_range(backend, sheet, range)?)))
        .collect()
}

/// Read several ranges from one sheet, preserving their order
pub fn read_all<B>(backend: &B, sheet: SheetHandle, ranges: &[RangeSpec]) -> Result<Vec<Payload>>
where
    B: ReadBackend + ?Sized,
{
    ranges
        .iter()
        .map(|range| read_range(backend, sheet, range))
        .collect()
}
