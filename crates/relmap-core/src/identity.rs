//! Primary-key identity: the column(s) and value(s) addressing one row.
//!
//! An [`Identity`] is write-once per component so that autoincrement keys
//! can be assigned after an insert without ever allowing a key to change.
//! The hashable [`IdentityKey`] form is structural (table + ordered
//! canonical values) rather than a delimiter-joined string, so key data
//! can never collide with a serialization scheme.

use crate::error::{Error, FieldErrorKind, IdentityErrorKind, Result};
use crate::value::Value;

/// The primary-key identity of one row: an ordered set of named
/// components, each settable exactly once.
#[derive(Debug, Clone)]
pub struct Identity {
    components: Vec<(String, Option<Value>)>,
}

impl Identity {
    /// Create an identity with the given key columns, all unset.
    ///
    /// Column order is preserved and significant for composite keys.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: columns.into_iter().map(|c| (c.into(), None)).collect(),
        }
    }

    /// Number of key columns.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether this identity has no columns (never valid for a mapped table).
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Whether this is a composite (multi-column) key.
    pub fn is_composite(&self) -> bool {
        self.components.len() > 1
    }

    /// The key column names, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(c, _)| c.as_str())
    }

    /// Whether the named column is part of this identity.
    pub fn has_column(&self, column: &str) -> bool {
        self.components.iter().any(|(c, _)| c == column)
    }

    /// Get a component value (None if unset or unknown).
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.components
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Set a component value, exactly once.
    ///
    /// Fails with `ImmutableFieldAlreadySet` on a second set, with
    /// `FieldDoesNotExist` for a column outside the key, and with
    /// `PrimaryKeyValueNotScalar` for a NULL value.
    pub fn set(&mut self, column: &str, value: Value) -> Result<()> {
        if !value.is_scalar_key() {
            return Err(Error::field(
                FieldErrorKind::PrimaryKeyValueNotScalar,
                format!("primary-key column '{}' requires a scalar value", column),
            ));
        }
        let slot = self
            .components
            .iter_mut()
            .find(|(c, _)| c == column)
            .ok_or_else(|| {
                Error::field(
                    FieldErrorKind::FieldDoesNotExist,
                    format!("'{}' is not a primary-key column", column),
                )
            })?;
        if slot.1.is_some() {
            return Err(Error::identity(
                IdentityErrorKind::ImmutableFieldAlreadySet,
                format!("primary-key column '{}' is already set", column),
            ));
        }
        slot.1 = Some(value);
        Ok(())
    }

    /// Whether every component has a value.
    pub fn is_complete(&self) -> bool {
        self.components.iter().all(|(_, v)| v.is_some())
    }

    /// The component values in column order, if complete.
    pub fn values(&self) -> Option<Vec<&Value>> {
        self.components
            .iter()
            .map(|(_, v)| v.as_ref())
            .collect::<Option<Vec<_>>>()
    }

    /// Iterate over (column, value) pairs for set components.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.components
            .iter()
            .filter_map(|(c, v)| v.as_ref().map(|v| (c.as_str(), v)))
    }

    /// Two identities are equal iff every named component is present in
    /// both and loosely equal (numeric representations tolerated).
    pub fn same_row_as(&self, other: &Identity) -> bool {
        if self.components.len() != other.components.len() {
            return false;
        }
        self.components.iter().zip(&other.components).all(
            |((ca, va), (cb, vb))| match (ca == cb, va, vb) {
                (true, Some(a), Some(b)) => a.loosely_equals(b),
                _ => false,
            },
        )
    }

    /// The hashable key for this identity within the given table.
    ///
    /// Returns `None` while any component is unset.
    pub fn key(&self, table: &str) -> Option<IdentityKey> {
        let parts = self
            .components
            .iter()
            .map(|(_, v)| v.as_ref().map(CanonValue::from_value))
            .collect::<Option<Vec<_>>>()?;
        Some(IdentityKey {
            table: table.to_string(),
            parts,
        })
    }
}

/// A canonicalized key component value.
///
/// Values that read as the same number fold onto one representation, so
/// hashing agrees with loose equality: `Int(1)` and `Text("1")` map to
/// the same component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonValue {
    Bool(bool),
    Int(i64),
    /// Float bit pattern (non-integral floats only)
    Float(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl CanonValue {
    /// Canonicalize a scalar value.
    ///
    /// Callers reject NULL first (`Value::is_scalar_key`); the NULL arm
    /// only keeps this function total.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => CanonValue::Bool(*b),
            Value::Int(i) => CanonValue::Int(*i),
            Value::Float(f) => Self::from_float(*f),
            Value::Decimal(s) | Value::Text(s) => {
                let t = s.trim();
                if let Ok(i) = t.parse::<i64>() {
                    return CanonValue::Int(i);
                }
                if let Ok(f) = t.parse::<f64>() {
                    return Self::from_float(f);
                }
                CanonValue::Text(s.clone())
            }
            Value::Bytes(b) => CanonValue::Bytes(b.clone()),
            Value::Null => CanonValue::Bytes(Vec::new()),
        }
    }

    fn from_float(f: f64) -> Self {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            CanonValue::Int(f as i64)
        } else {
            CanonValue::Float(f.to_bits())
        }
    }
}

/// The identity-map key: table name plus ordered canonical key values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    table: String,
    parts: Vec<CanonValue>,
}

impl IdentityKey {
    /// Build a key directly from scalar values (fetch-path lookups).
    ///
    /// Fails with `PrimaryKeyValueNotScalar` if any value is NULL.
    pub fn from_values(table: &str, values: &[Value]) -> Result<Self> {
        let parts = values
            .iter()
            .map(|v| {
                if v.is_scalar_key() {
                    Ok(CanonValue::from_value(v))
                } else {
                    Err(Error::field(
                        FieldErrorKind::PrimaryKeyValueNotScalar,
                        format!("key for table '{}' contains a non-scalar value", table),
                    ))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            table: table.to_string(),
            parts,
        })
    }

    /// The table this key addresses.
    pub fn table(&self) -> &str {
        &self.table
    }
}
