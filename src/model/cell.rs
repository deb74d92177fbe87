//! Untyped edit-buffer cells.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// A single cell of an edit buffer, before normalization.
///
/// Edited tables come from files and grids that make no type promises,
/// so a cell may hold anything a spreadsheet can.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Null, or a NaN number.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Null, NaN, or text that is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            other => other.is_null(),
        }
    }

    /// Stringify the cell. Null and NaN become the empty string.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Integral values print without a fractional part so that numeric work
/// order and PO numbers read back the way they were typed.
#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Text(nested.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_and_blank() {
        assert!(Cell::Null.is_null());
        assert!(Cell::Number(f64::NAN).is_null());
        assert!(!Cell::Number(0.0).is_null());
        assert!(Cell::Text("   ".into()).is_blank());
        assert!(!Cell::Text("x".into()).is_blank());
        assert!(!Cell::Text(String::new()).is_null());
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Cell::Null.to_text(), "");
        assert_eq!(Cell::Number(f64::NAN).to_text(), "");
        assert_eq!(Cell::Number(12345.0).to_text(), "12345");
        assert_eq!(Cell::Number(12.5).to_text(), "12.5");
        assert_eq!(Cell::Bool(true).to_text(), "true");
        assert_eq!(
            Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).to_text(),
            "2024-03-01"
        );
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Cell::from(&json!(null)), Cell::Null);
        assert_eq!(Cell::from(&json!("a")), Cell::Text("a".into()));
        assert_eq!(Cell::from(&json!(3)), Cell::Number(3.0));
        assert_eq!(Cell::from(&json!(false)), Cell::Bool(false));
        assert_eq!(Cell::from(&json!([1, 2])), Cell::Text("[1,2]".into()));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Cell::from(None::<f64>), Cell::Null);
        assert_eq!(Cell::from(Some("x")), Cell::Text("x".into()));
    }
}
