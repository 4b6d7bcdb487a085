//! Range payloads

use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::value::Value;

/// Values carried to or from a range
///
/// The variant must agree with the range [`Shape`]: a single value for
/// `Scalar`, a flat sequence for `Row` and `Column`, and a row-major
/// sequence of equal-length rows for `Matrix`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Payload {
    Scalar(Value),
    Vector(Vec<Value>),
    Matrix(Vec<Vec<Value>>),
}

impl Payload {
    pub fn scalar<V: Into<Value>>(value: V) -> Self {
        Payload::Scalar(value.into())
    }

    pub fn vector<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Payload::Vector(values.into_iter().map(Into::into).collect())
    }

    pub fn matrix<R, I, V>(rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Payload::Matrix(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Short description of the payload arity, e.g. `sequence of 3`
    pub fn describe(&self) -> String {
        match self {
            Payload::Scalar(_) => "single value".to_string(),
            Payload::Vector(values) => format!("sequence of {}", values.len()),
            Payload::Matrix(rows) => {
                let widths: Vec<usize> = rows.iter().map(Vec::len).collect();
                match widths.first() {
                    None => "matrix of 0 rows".to_string(),
                    Some(&w) if widths.iter().all(|&x| x == w) => {
                        format!("matrix of {} rows x {} columns", rows.len(), w)
                    }
                    Some(_) => format!("ragged matrix with row widths {:?}", widths),
                }
            }
        }
    }

    /// Verify that this payload fits `shape` exactly
    pub fn check_arity(&self, shape: &Shape) -> Result<()> {
        let ok = match (shape, self) {
            (Shape::Scalar, Payload::Scalar(_)) => true,
            (Shape::Row(n), Payload::Vector(values)) | (Shape::Column(n), Payload::Vector(values)) => {
                values.len() as u64 == u64::from(*n)
            }
            (Shape::Matrix(rows, cols), Payload::Matrix(data)) => {
                data.len() as u64 == u64::from(*rows)
                    && data.iter().all(|row| row.len() as u64 == u64::from(*cols))
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::PayloadArityMismatch {
                expected: expected_arity(shape),
                actual: self.describe(),
            })
        }
    }

    /// Iterate values in row-major order
    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Payload::Scalar(v) => Box::new(std::iter::once(v)),
            Payload::Vector(values) => Box::new(values.iter()),
            Payload::Matrix(rows) => Box::new(rows.iter().flatten()),
        }
    }

    /// Number of values carried
    pub fn len(&self) -> usize {
        match self {
            Payload::Scalar(_) => 1,
            Payload::Vector(values) => values.len(),
            Payload::Matrix(rows) => rows.iter().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the scalar value, if this is a scalar payload
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Payload::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Payload::Vector(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&[Vec<Value>]> {
        match self {
            Payload::Matrix(rows) => Some(rows),
            _ => None,
        }
    }
}

fn expected_arity(shape: &Shape) -> String {
    match shape {
        Shape::Scalar => "single value".to_string(),
        Shape::Row(n) | Shape::Column(n) => format!("sequence of {}", n),
        Shape::Matrix(rows, cols) => format!("matrix of {} rows x {} columns", rows, cols),
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Scalar(v)
    }
}

impl From<Vec<Value>> for Payload {
    fn from(values: Vec<Value>) -> Self {
        Payload::Vector(values)
    }
}

impl From<Vec<Vec<Value>>> for Payload {
    fn from(rows: Vec<Vec<Value>>) -> Self {
        Payload::Matrix(rows)
    }
}
