//! Logical type tags and typed cell values

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// Text layout used when dates are rendered or parsed as strings
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text layout used when date-times are rendered or parsed as strings
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The kind of value a range is declared to hold
///
/// The tag governs how a backend coerces or formats values, never how the
/// dispatcher walks the range geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogicalType {
    Int,
    Float,
    Str,
    Bool,
    Date,
    DateTime,
    /// Untyped: values are passed through as stored
    Any,
}

impl LogicalType {
    /// All tags, in declaration order
    pub const ALL: [LogicalType; 7] = [
        LogicalType::Int,
        LogicalType::Float,
        LogicalType::Str,
        LogicalType::Bool,
        LogicalType::Date,
        LogicalType::DateTime,
        LogicalType::Any,
    ];

    /// Value substituted by lenient reads when a cell cannot be coerced
    pub fn default_value(&self) -> Value {
        match self {
            LogicalType::Int => Value::Int(0),
            LogicalType::Float => Value::Float(f64::NAN),
            LogicalType::Str => Value::Str(String::new()),
            LogicalType::Bool => Value::Bool(false),
            LogicalType::Date => Value::Date(NaiveDate::default()),
            LogicalType::DateTime => Value::DateTime(NaiveDateTime::default()),
            LogicalType::Any => Value::Empty,
        }
    }

    /// Get the tag name
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Int => "Int",
            LogicalType::Float => "Float",
            LogicalType::Str => "Str",
            LogicalType::Bool => "Bool",
            LogicalType::Date => "Date",
            LogicalType::DateTime => "DateTime",
            LogicalType::Any => "Any",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(LogicalType::Int),
            "float" | "number" => Ok(LogicalType::Float),
            "str" | "string" | "text" => Ok(LogicalType::Str),
            "bool" | "boolean" => Ok(LogicalType::Bool),
            "date" => Ok(LogicalType::Date),
            "datetime" => Ok(LogicalType::DateTime),
            "any" => Ok(LogicalType::Any),
            other => Err(Error::other(format!("unknown logical type '{}'", other))),
        }
    }
}

/// A single typed cell value
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Blank cell
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    /// Check if the value is blank
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Convert this value to the given logical type
    ///
    /// Returns `None` when the conversion would lose information or has no
    /// sensible meaning. `Empty` only converts to [`LogicalType::Any`].
    pub fn coerce(&self, dtype: LogicalType) -> Option<Value> {
        match (dtype, self) {
            (LogicalType::Any, v) => Some(v.clone()),
            (_, Value::Empty) => None,

            (LogicalType::Int, Value::Int(n)) => Some(Value::Int(*n)),
            (LogicalType::Int, Value::Float(n)) => float_to_int(*n).map(Value::Int),
            (LogicalType::Int, Value::Str(s)) => s.trim().parse::<i64>().ok().map(Value::Int),

            (LogicalType::Float, Value::Float(n)) => Some(Value::Float(*n)),
            (LogicalType::Float, Value::Int(n)) => Some(Value::Float(*n as f64)),
            (LogicalType::Float, Value::Str(s)) => s.trim().parse::<f64>().ok().map(Value::Float),

            (LogicalType::Str, Value::Str(s)) => Some(Value::Str(s.clone())),
            (LogicalType::Str, v) => Some(Value::Str(v.to_string())),

            (LogicalType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (LogicalType::Bool, Value::Str(s)) => parse_bool(s).map(Value::Bool),

            (LogicalType::Date, Value::Date(d)) => Some(Value::Date(*d)),
            (LogicalType::Date, Value::Str(s)) => parse_date(s).map(Value::Date),

            (LogicalType::DateTime, Value::DateTime(dt)) => Some(Value::DateTime(*dt)),
            (LogicalType::DateTime, Value::Date(d)) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
            (LogicalType::DateTime, Value::Str(s)) => parse_datetime(s).map(Value::DateTime),

            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Empty)
    }
}

/// Convert an integral float to an integer without losing information
pub fn float_to_int(n: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or above it overflows i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if n.is_finite() && n.fract() == 0.0 && n >= -LIMIT && n < LIMIT {
        Some(n as i64)
    } else {
        None
    }
}

/// Parse `TRUE`/`FALSE` (case-insensitive)
pub fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse an ISO date (`2024-01-31`)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Parse an ISO date-time, with either a space or `T` separator
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(3.5), Value::Float(3.5));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("hi"), Value::Str("hi".into()));
        assert_eq!(Value::from(None::<i64>), Value::Empty);
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(Value::Float(4.0).coerce(LogicalType::Int), Some(Value::Int(4)));
        assert_eq!(Value::Float(4.5).coerce(LogicalType::Int), None);
        assert_eq!(Value::Float(f64::NAN).coerce(LogicalType::Int), None);
        assert_eq!(Value::string(" 12 ").coerce(LogicalType::Int), Some(Value::Int(12)));
        assert_eq!(Value::Bool(true).coerce(LogicalType::Int), None);
    }

    #[test]
    fn test_coerce_str_formats_everything() {
        assert_eq!(
            Value::Int(7).coerce(LogicalType::Str),
            Some(Value::string("7"))
        );
        assert_eq!(
            Value::Bool(false).coerce(LogicalType::Str),
            Some(Value::string("FALSE"))
        );
        assert_eq!(
            Value::Date(date(2024, 2, 29)).coerce(LogicalType::Str),
            Some(Value::string("2024-02-29"))
        );
    }

    #[test]
    fn test_coerce_dates() {
        let d = date(2023, 7, 1);
        let dt = d.and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(Value::Date(d).coerce(LogicalType::DateTime), Some(Value::DateTime(dt)));
        assert_eq!(Value::DateTime(dt).coerce(LogicalType::Date), None);
        assert_eq!(
            Value::string("2023-07-01T00:00:00").coerce(LogicalType::DateTime),
            Some(Value::DateTime(dt))
        );
    }

    #[test]
    fn test_empty_only_coerces_to_any() {
        for dtype in LogicalType::ALL {
            let expected = if dtype == LogicalType::Any {
                Some(Value::Empty)
            } else {
                None
            };
            assert_eq!(Value::Empty.coerce(dtype), expected, "{dtype}");
        }
    }

    #[test]
    fn test_datetime_display_roundtrip() {
        let dt = date(2001, 9, 9).and_hms_milli_opt(1, 46, 40, 250).unwrap();
        let text = Value::DateTime(dt).to_string();
        assert_eq!(text, "2001-09-09 01:46:40.250");
        assert_eq!(parse_datetime(&text), Some(dt));
    }

    #[test]
    fn test_logical_type_parse() {
        assert_eq!("INT".parse::<LogicalType>().unwrap(), LogicalType::Int);
        assert_eq!("text".parse::<LogicalType>().unwrap(), LogicalType::Str);
        assert!("decimal".parse::<LogicalType>().is_err());
    }
}
