//! Per-entity storage configuration.
//!
//! A [`TableInfo`] is built explicitly at startup and passed by
//! reference; nothing is derived from type or table names at runtime.

use crate::error::{Error, FieldErrorKind, Result};
use crate::identity::Identity;
use crate::result::ResultRow;
use crate::row::{Row, RowStatus};
use crate::value::Value;
use std::collections::HashMap;

/// A non-key data column with its table-declared default.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    default: Value,
}

impl ColumnDef {
    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default value applied by the row factory.
    pub fn default(&self) -> &Value {
        &self.default
    }
}

/// Storage configuration for one table: name, primary-key columns,
/// ordered data columns with defaults, autoincrement flag.
#[derive(Debug, Clone)]
pub struct TableInfo {
    table: String,
    key_columns: Vec<String>,
    columns: Vec<ColumnDef>,
    autoincrement: bool,
}

impl TableInfo {
    /// Start a table definition.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key_columns: Vec::new(),
            columns: Vec::new(),
            autoincrement: false,
        }
    }

    /// Add a primary-key column. Call once per component, in key order.
    #[must_use]
    pub fn key(mut self, column: impl Into<String>) -> Self {
        self.key_columns.push(column.into());
        self
    }

    /// Add a data column with its default value.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            default: default.into(),
        });
        self
    }

    /// Mark the (single-column) key as database-generated.
    #[must_use]
    pub fn autoincrement(mut self, value: bool) -> Self {
        self.autoincrement = value;
        self
    }

    /// The table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary-key column names, in key order.
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Whether the primary key spans more than one column.
    pub fn has_composite_key(&self) -> bool {
        self.key_columns.len() > 1
    }

    /// Whether the key is database-generated.
    pub const fn is_autoincrement(&self) -> bool {
        self.autoincrement
    }

    /// Data column definitions, in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Every column name, key columns first.
    pub fn all_columns(&self) -> Vec<&str> {
        self.key_columns
            .iter()
            .map(String::as_str)
            .chain(self.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Whether the named column exists on this table.
    pub fn has_column(&self, name: &str) -> bool {
        self.key_columns.iter().any(|c| c == name) || self.columns.iter().any(|c| c.name == name)
    }

    /// Build a `New` row from defaults plus overrides.
    ///
    /// Overrides may address key columns (explicit identities) or data
    /// columns; an unknown name fails with `FieldDoesNotExist`.
    pub fn new_row(&self, overrides: &[(&str, Value)]) -> Result<Row> {
        let identity = Identity::new(self.key_columns.iter().cloned());
        let data: HashMap<String, Value> = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.default.clone()))
            .collect();
        let mut row = Row::new(self.table.clone(), identity, data)?;

        for (name, value) in overrides {
            if !self.has_column(name) {
                return Err(Error::field(
                    FieldErrorKind::FieldDoesNotExist,
                    format!("no column '{}' on table '{}'", name, self.table),
                ));
            }
            row.set(name, value.clone())?;
        }
        Ok(row)
    }

    /// Build a `Clean` row from a fetched result row.
    ///
    /// Key columns must be present and scalar; data columns absent from
    /// the result fall back to their defaults.
    pub fn row_from_result(&self, result: &ResultRow) -> Result<Row> {
        let mut identity = Identity::new(self.key_columns.iter().cloned());
        for key_col in &self.key_columns {
            let value = result.get_by_name(key_col).ok_or_else(|| {
                Error::field(
                    FieldErrorKind::PrimaryKeyValueMissing,
                    format!(
                        "result row for table '{}' is missing key column '{}'",
                        self.table, key_col
                    ),
                )
            })?;
            identity.set(key_col, value.clone())?;
        }

        let data: HashMap<String, Value> = self
            .columns
            .iter()
            .map(|c| {
                let value = result
                    .get_by_name(&c.name)
                    .cloned()
                    .unwrap_or_else(|| c.default.clone());
                (c.name.clone(), value)
            })
            .collect();

        let mut row = Row::new(self.table.clone(), identity, data)?;
        row.set_status(RowStatus::Clean);
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threads() -> TableInfo {
        TableInfo::new("threads")
            .key("thread_id")
            .autoincrement(true)
            .column("subject", Value::Null)
            .column("views", 0_i64)
    }

    #[test]
    fn test_builder_chain() {
        let info = threads();
        assert_eq!(info.table(), "threads");
        assert_eq!(info.key_columns(), &["thread_id".to_string()]);
        assert!(info.is_autoincrement());
        assert!(!info.has_composite_key());
        assert_eq!(info.columns().len(), 2);
        assert_eq!(info.all_columns(), vec!["thread_id", "subject", "views"]);
    }

    #[test]
    fn test_new_row_applies_defaults_and_overrides() {
        let info = threads();
        let row = info
            .new_row(&[("subject", Value::Text("first".into()))])
            .unwrap();

        assert_eq!(row.status(), RowStatus::New);
        assert_eq!(row.get("subject"), Some(&Value::Text("first".into())));
        assert_eq!(row.get("views"), Some(&Value::Int(0)));
        assert_eq!(row.get("thread_id"), None);
    }

    #[test]
    fn test_new_row_rejects_unknown_override() {
        let info = threads();
        let err = info.new_row(&[("nope", Value::Int(1))]).unwrap_err();
        assert!(matches!(
            err,
            Error::Field(ref e) if e.kind == FieldErrorKind::FieldDoesNotExist
        ));
    }

    #[test]
    fn test_new_row_accepts_explicit_key() {
        let info = TableInfo::new("tags").key("tag").column("label", Value::Null);
        let row = info.new_row(&[("tag", Value::Text("rust".into()))]).unwrap();
        assert_eq!(row.get("tag"), Some(&Value::Text("rust".into())));
    }

    #[test]
    fn test_row_from_result() {
        let info = threads();
        let result = ResultRow::new(
            vec!["thread_id".into(), "subject".into(), "views".into()],
            vec![Value::Int(5), Value::Text("hi".into()), Value::Int(9)],
        );
        let row = info.row_from_result(&result).unwrap();

        assert_eq!(row.status(), RowStatus::Clean);
        assert_eq!(row.get("thread_id"), Some(&Value::Int(5)));
        assert_eq!(row.get("views"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_row_from_result_missing_key() {
        let info = threads();
        let result = ResultRow::new(vec!["subject".into()], vec![Value::Null]);
        let err = info.row_from_result(&result).unwrap_err();
        assert!(matches!(
            err,
            Error::Field(ref e) if e.kind == FieldErrorKind::PrimaryKeyValueMissing
        ));
    }

    #[test]
    fn test_row_from_result_defaults_absent_columns() {
        let info = threads();
        let result = ResultRow::new(
            vec!["thread_id".into(), "subject".into()],
            vec![Value::Int(1), Value::Text("hi".into())],
        );
        let row = info.row_from_result(&result).unwrap();
        assert_eq!(row.get("views"), Some(&Value::Int(0)));
    }
}
