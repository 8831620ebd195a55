//! Dynamic column values.

use serde::{Deserialize, Serialize};

/// A dynamically-typed column value.
///
/// This enum represents every value a row column or bound statement
/// parameter can hold. Collections are intentionally absent: a column
/// holds a scalar or NULL, never a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Arbitrary precision decimal (stored as string)
    Decimal(String),

    /// Text string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "BIGINT",
            Value::Float(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
        }
    }

    /// Whether this value may serve as a primary-key component.
    ///
    /// NULL never addresses a row; everything else does.
    pub const fn is_scalar_key(&self) -> bool {
        !self.is_null()
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Decimal(s) | Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Decimal(s) | Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to view this value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric reading of this value, if it has one.
    ///
    /// Text and decimals participate when they parse as numbers, so
    /// driver coercion (`"1"` for an integer column) stays comparable.
    fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::Int(v) => Some(Numeric::Int(*v)),
            Value::Float(v) => Some(Numeric::Float(*v)),
            Value::Decimal(s) | Value::Text(s) => {
                let t = s.trim();
                if let Ok(i) = t.parse::<i64>() {
                    return Some(Numeric::Int(i));
                }
                t.parse::<f64>().ok().map(Numeric::Float)
            }
            _ => None,
        }
    }

    /// Compare two values tolerantly.
    ///
    /// Numeric-readable values compare by numeric value regardless of
    /// representation (`Int(1)`, `Text("1")`, and `Float(1.0)` are all
    /// equal); everything else compares strictly. This is the equality
    /// used for change diffing and identity comparison.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.eq_value(b),
            _ => false,
        }
    }
}

/// A numeric reading of a [`Value`], for tolerant comparison.
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn eq_value(self, other: Numeric) -> bool {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            (Numeric::Float(a), Numeric::Float(b)) => a == b,
            (Numeric::Int(i), Numeric::Float(f)) | (Numeric::Float(f), Numeric::Int(i)) => {
                f == i as f64
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::Int(0).is_null());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "NULL");
        assert_eq!(Value::Int(1).type_name(), "BIGINT");
        assert_eq!(Value::Text("x".into()).type_name(), "TEXT");
        assert_eq!(Value::Bytes(vec![1]).type_name(), "BLOB");
    }

    #[test]
    fn test_as_i64_coercions() {
        assert_eq!(Value::Int(42).as_i64(), Some(42));
        assert_eq!(Value::Bool(true).as_i64(), Some(1));
        assert_eq!(Value::Text("7".into()).as_i64(), Some(7));
        assert_eq!(Value::Text("abc".into()).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn test_as_f64_coercions() {
        assert_eq!(Value::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::Decimal("3.25".into()).as_f64(), Some(3.25));
    }

    #[test]
    fn test_loose_equality_across_representations() {
        assert!(Value::Int(1).loosely_equals(&Value::Text("1".into())));
        assert!(Value::Text("1".into()).loosely_equals(&Value::Int(1)));
        assert!(Value::Int(1).loosely_equals(&Value::Float(1.0)));
        assert!(Value::Decimal("2.5".into()).loosely_equals(&Value::Float(2.5)));
    }

    #[test]
    fn test_loose_equality_is_strict_for_text() {
        assert!(!Value::Text("a".into()).loosely_equals(&Value::Text("b".into())));
        assert!(Value::Text("a".into()).loosely_equals(&Value::Text("a".into())));
        // Non-numeric text never equals a number.
        assert!(!Value::Text("one".into()).loosely_equals(&Value::Int(1)));
    }

    #[test]
    fn test_loose_equality_null() {
        assert!(Value::Null.loosely_equals(&Value::Null));
        assert!(!Value::Null.loosely_equals(&Value::Int(0)));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
    }

    #[test]
    fn test_scalar_key() {
        assert!(Value::Int(1).is_scalar_key());
        assert!(Value::Text("k".into()).is_scalar_key());
        assert!(!Value::Null.is_scalar_key());
    }
}
