//! Typed CSV cells.
//!
//! A cell is parsed according to the inferred type of its column. A cell that
//! is empty, matches a configured null token, or does not fit its column type
//! becomes [`Value::Null`]; the cleaner later drops such rows.

use crate::schema::ColumnType;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Double(OrderedFloat<f64>),
    Text(String),
}

/// Whether `cell` parses as a floating point number written with digits
/// (`NaN` and `inf` spellings do not count).
pub(crate) fn parse_double(cell: &str) -> Option<f64> {
    if !cell.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    cell.parse::<f64>().ok().filter(|f| f.is_finite())
}

impl Value {
    /// Parse a raw cell for a column of type `ty`.
    pub fn parse(cell: &str, ty: ColumnType, null_values: &[String]) -> Value {
        if cell.is_empty() || null_values.iter().any(|n| n == cell) {
            return Value::Null;
        }
        match ty {
            ColumnType::Integer => cell.parse::<i64>().map_or(Value::Null, Value::Int),
            ColumnType::Double => parse_double(cell).map_or(Value::Null, |f| Value::Double(OrderedFloat(f))),
            ColumnType::Text => Value::Text(cell.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text rendering used when a column is read as a string.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(d.0),
            Value::Text(s) => parse_double(s.trim()),
        }
    }

    /// Cast to `FLOAT`. Anything that does not read as a number is `None`.
    pub fn to_f32(&self) -> Option<f32> {
        self.to_f64().map(|f| f as f32).filter(|f| f.is_finite())
    }

    /// Cast to `INT`. Doubles truncate toward zero; out-of-range values are `None`.
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            Value::Null => None,
            Value::Int(i) => i32::try_from(*i).ok(),
            Value::Double(d) => truncate_to_i32(d.0),
            Value::Text(s) => {
                let s = s.trim();
                s.parse::<i32>()
                    .ok()
                    .or_else(|| parse_double(s).and_then(truncate_to_i32))
            }
        }
    }
}

fn truncate_to_i32(f: f64) -> Option<i32> {
    let t = f.trunc();
    if t >= f64::from(i32::MIN) && t <= f64::from(i32::MAX) {
        Some(t as i32)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => write!(f, "{}", d.0),
            Value::Text(s) => f.write_str(s),
        }
    }
}
