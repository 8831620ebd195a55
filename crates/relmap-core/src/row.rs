//! The entity row: table-shaped data plus mutation status.

use crate::error::{Error, FieldErrorKind, IdentityErrorKind, Result};
use crate::identity::{Identity, IdentityKey};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Mutation status of a [`Row`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Freshly constructed, never persisted
    New,
    /// Loaded from storage, unmodified
    Clean,
    /// Modified since load or last write
    Dirty,
    /// Marked for deletion
    Trash,
    /// Successfully inserted this session
    Inserted,
    /// Successfully updated this session
    Updated,
    /// Successfully deleted; the row is frozen
    Deleted,
    /// A write against this row reported an unexpected result
    Failed,
}

impl RowStatus {
    /// Human-readable status name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RowStatus::New => "new",
            RowStatus::Clean => "clean",
            RowStatus::Dirty => "dirty",
            RowStatus::Trash => "trash",
            RowStatus::Inserted => "inserted",
            RowStatus::Updated => "updated",
            RowStatus::Deleted => "deleted",
            RowStatus::Failed => "failed",
        }
    }
}

/// A single entity row: primary-key identity, non-key column data, and
/// status.
///
/// Invariant: a column belongs to the identity or to the data map, never
/// both.
#[derive(Debug)]
pub struct Row {
    table: String,
    identity: Identity,
    data: HashMap<String, Value>,
    status: RowStatus,
}

/// Shared handle to a row.
///
/// The identity map guarantees at most one of these per row identity;
/// cloning the `Arc` preserves reference identity.
pub type SharedRow = Arc<RwLock<Row>>;

impl Row {
    /// Create a `New` row.
    ///
    /// Fails with `FieldDoesNotExist` if `data` names an identity column.
    pub fn new(
        table: impl Into<String>,
        identity: Identity,
        data: HashMap<String, Value>,
    ) -> Result<Self> {
        for column in data.keys() {
            if identity.has_column(column) {
                return Err(Error::field(
                    FieldErrorKind::FieldDoesNotExist,
                    format!(
                        "column '{}' is part of the primary key and cannot appear in row data",
                        column
                    ),
                ));
            }
        }
        Ok(Self {
            table: table.into(),
            identity,
            data,
            status: RowStatus::New,
        })
    }

    /// Wrap a row in its shared handle.
    pub fn into_shared(self) -> SharedRow {
        Arc::new(RwLock::new(self))
    }

    /// The table this row belongs to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Current status.
    pub const fn status(&self) -> RowStatus {
        self.status
    }

    /// Set the status directly.
    ///
    /// Gateways drive the load/write transitions; `mark_trash` is the
    /// only transition user code should reach for.
    pub fn set_status(&mut self, status: RowStatus) {
        self.status = status;
    }

    /// Mark this row for deletion.
    pub fn mark_trash(&mut self) -> Result<()> {
        self.frozen_check("mark trash")?;
        self.status = RowStatus::Trash;
        Ok(())
    }

    /// Whether this row still accepts mutation.
    pub const fn is_mutable(&self) -> bool {
        !matches!(self.status, RowStatus::Deleted)
    }

    /// The primary-key identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The identity-map key, if the identity is complete.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        self.identity.key(&self.table)
    }

    /// Whether the named column exists on this row (identity or data).
    pub fn has_field(&self, column: &str) -> bool {
        self.identity.has_column(column) || self.data.contains_key(column)
    }

    /// Get a column value (identity first, then data).
    pub fn get(&self, column: &str) -> Option<&Value> {
        if self.identity.has_column(column) {
            return self.identity.get(column);
        }
        self.data.get(column)
    }

    /// Set a column value, routing to the identity (write-once) or the
    /// data map.
    ///
    /// Data mutation while `Clean`/`Inserted`/`Updated` promotes the row
    /// to `Dirty` when the new value actually differs (loose equality).
    pub fn set(&mut self, column: &str, value: Value) -> Result<()> {
        self.frozen_check(column)?;
        if self.identity.has_column(column) {
            return self.identity.set(column, value);
        }
        let slot = self.data.get_mut(column).ok_or_else(|| {
            Error::field(
                FieldErrorKind::FieldDoesNotExist,
                format!("no column '{}' on table '{}'", column, self.table),
            )
        })?;
        let changed = !slot.loosely_equals(&value);
        *slot = value;
        if changed
            && matches!(
                self.status,
                RowStatus::Clean | RowStatus::Inserted | RowStatus::Updated
            )
        {
            self.status = RowStatus::Dirty;
        }
        Ok(())
    }

    /// Set an identity component (deferred autoincrement assignment).
    pub fn set_identity_value(&mut self, column: &str, value: Value) -> Result<()> {
        self.frozen_check(column)?;
        self.identity.set(column, value)
    }

    /// The non-key column data.
    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    /// A copy of the current non-key column values.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.data.clone()
    }

    fn frozen_check(&self, what: &str) -> Result<()> {
        if self.is_mutable() {
            Ok(())
        } else {
            Err(Error::identity(
                IdentityErrorKind::ImmutableOnceDeleted,
                format!(
                    "row in table '{}' was deleted; cannot touch '{}'",
                    self.table, what
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        let identity = Identity::new(["id"]);
        let mut data = HashMap::new();
        data.insert("subject".to_string(), Value::Text("hello".to_string()));
        data.insert("views".to_string(), Value::Int(0));
        Row::new("threads", identity, data).unwrap()
    }

    #[test]
    fn test_new_row_status() {
        let row = sample_row();
        assert_eq!(row.status(), RowStatus::New);
        assert!(row.is_mutable());
    }

    #[test]
    fn test_identity_column_not_in_data() {
        let identity = Identity::new(["id"]);
        let mut data = HashMap::new();
        data.insert("id".to_string(), Value::Int(1));
        assert!(Row::new("threads", identity, data).is_err());
    }

    #[test]
    fn test_get_routes_identity_then_data() {
        let mut row = sample_row();
        row.set("id", Value::Int(9)).unwrap();

        assert_eq!(row.get("id"), Some(&Value::Int(9)));
        assert_eq!(row.get("subject"), Some(&Value::Text("hello".into())));
        assert_eq!(row.get("missing"), None);
        assert!(row.has_field("id"));
        assert!(row.has_field("views"));
        assert!(!row.has_field("missing"));
    }

    #[test]
    fn test_clean_to_dirty_on_change() {
        let mut row = sample_row();
        row.set_status(RowStatus::Clean);

        // Same value (loosely) does not dirty the row.
        row.set("views", Value::Text("0".to_string())).unwrap();
        assert_eq!(row.status(), RowStatus::Clean);

        row.set("views", Value::Int(3)).unwrap();
        assert_eq!(row.status(), RowStatus::Dirty);
    }

    #[test]
    fn test_new_stays_new_on_change() {
        let mut row = sample_row();
        row.set("views", Value::Int(5)).unwrap();
        assert_eq!(row.status(), RowStatus::New);
    }

    #[test]
    fn test_updated_goes_dirty_again() {
        let mut row = sample_row();
        row.set_status(RowStatus::Updated);
        row.set("subject", Value::Text("edited".to_string())).unwrap();
        assert_eq!(row.status(), RowStatus::Dirty);
    }

    #[test]
    fn test_deleted_is_frozen() {
        let mut row = sample_row();
        row.set_status(RowStatus::Deleted);
        assert!(!row.is_mutable());

        let err = row.set("subject", Value::Text("x".into())).unwrap_err();
        assert!(matches!(
            err,
            Error::Identity(ref e) if e.kind == IdentityErrorKind::ImmutableOnceDeleted
        ));
        assert!(row.mark_trash().is_err());
    }

    #[test]
    fn test_mark_trash() {
        let mut row = sample_row();
        row.set_status(RowStatus::Clean);
        row.mark_trash().unwrap();
        assert_eq!(row.status(), RowStatus::Trash);
        // Trash rows still accept edits without changing status.
        row.set("views", Value::Int(2)).unwrap();
        assert_eq!(row.status(), RowStatus::Trash);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut row = sample_row();
        let err = row.set("nope", Value::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            Error::Field(ref e) if e.kind == FieldErrorKind::FieldDoesNotExist
        ));
    }

    #[test]
    fn test_identity_key_tracks_completeness() {
        let mut row = sample_row();
        assert!(row.identity_key().is_none());
        row.set_identity_value("id", Value::Int(4)).unwrap();
        assert!(row.identity_key().is_some());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(RowStatus::New.as_str(), "new");
        assert_eq!(RowStatus::Deleted.as_str(), "deleted");
    }
}
