//! Records: the entity façade over a shared row and its related bag.

use crate::locator::{EntityConfig, FieldKind};
use relmap_core::error::{Error, FieldErrorKind, Result};
use relmap_core::identity::IdentityKey;
use relmap_core::row::{RowStatus, SharedRow};
use relmap_core::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One named relationship slot on a record.
#[derive(Debug, Clone, Default)]
pub enum RelatedSlot {
    /// The relationship has not been stitched yet
    #[default]
    Unset,
    /// Stitched, and no related entity matched (to-one only)
    NoMatch,
    /// A single related record
    One(Record),
    /// A collection of related records
    Many(Vec<Record>),
}

impl RelatedSlot {
    /// Whether this slot has been stitched (anything but `Unset`).
    pub const fn is_set(&self) -> bool {
        !matches!(self, RelatedSlot::Unset)
    }

    /// View the slot as a list of records (empty for unset/no-match).
    pub fn records(&self) -> &[Record] {
        match self {
            RelatedSlot::One(record) => std::slice::from_ref(record),
            RelatedSlot::Many(records) => records,
            RelatedSlot::Unset | RelatedSlot::NoMatch => &[],
        }
    }
}

/// The named-slot container for eagerly-stitched relationship results.
#[derive(Debug, Default)]
pub struct Related {
    slots: HashMap<String, RelatedSlot>,
}

impl Related {
    /// Read a slot; a name never stitched reads as `Unset`.
    pub fn get(&self, name: &str) -> RelatedSlot {
        self.slots.get(name).cloned().unwrap_or_default()
    }

    /// Whether the named slot has been stitched.
    pub fn is_set(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(RelatedSlot::is_set)
    }

    /// Write a slot.
    pub fn set(&mut self, name: impl Into<String>, slot: RelatedSlot) {
        self.slots.insert(name.into(), slot);
    }
}

/// A field read: either a column value or a relationship slot.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// An identity or data column value
    Column(Value),
    /// A relationship slot
    Related(RelatedSlot),
}

/// The entity façade: exactly one shared row plus one related bag.
///
/// Cloning a record clones handles, not data: both clones see the same
/// row and the same stitched relationships.
#[derive(Debug, Clone)]
pub struct Record {
    entity: Arc<EntityConfig>,
    row: SharedRow,
    related: Arc<RwLock<Related>>,
}

impl Record {
    /// Wrap a shared row for the given entity with an empty related bag.
    pub fn new(entity: Arc<EntityConfig>, row: SharedRow) -> Self {
        Self {
            entity,
            row,
            related: Arc::new(RwLock::new(Related::default())),
        }
    }

    /// The entity configuration this record belongs to.
    pub fn entity(&self) -> &Arc<EntityConfig> {
        &self.entity
    }

    /// The underlying shared row.
    pub fn row(&self) -> &SharedRow {
        &self.row
    }

    /// Whether two records wrap the same row instance.
    pub fn shares_row(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.row, &other.row)
    }

    /// Current row status.
    pub fn status(&self) -> RowStatus {
        self.row
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status()
    }

    /// The identity-map key, if the row's identity is complete.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        self.row
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .identity_key()
    }

    /// Read a field: row columns first, then the related bag.
    ///
    /// An unset identity component (pending autoincrement) reads as
    /// `Null`. A name known to neither the row nor the bag fails with
    /// `FieldDoesNotExist`.
    pub fn get(&self, name: &str) -> Result<FieldValue> {
        match self.entity.field_kind(name) {
            Some(FieldKind::Key | FieldKind::Column) => {
                let guard = self.row.read().unwrap_or_else(PoisonError::into_inner);
                Ok(FieldValue::Column(
                    guard.get(name).cloned().unwrap_or(Value::Null),
                ))
            }
            Some(FieldKind::Related) => {
                let guard = self.related.read().unwrap_or_else(PoisonError::into_inner);
                Ok(FieldValue::Related(guard.get(name)))
            }
            None => Err(self.unknown_field(name)),
        }
    }

    /// Read a column field directly as a value.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        match self.get(name)? {
            FieldValue::Column(value) => Ok(value),
            FieldValue::Related(_) => Err(Error::Custom(format!(
                "field '{}' on entity '{}' is a relationship, not a column",
                name,
                self.entity.name()
            ))),
        }
    }

    /// Write a column field, routing to the row.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        match self.entity.field_kind(name) {
            Some(FieldKind::Key | FieldKind::Column) => self
                .row
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .set(name, value),
            Some(FieldKind::Related) => Err(Error::Custom(format!(
                "field '{}' on entity '{}' is a relationship; use set_related",
                name,
                self.entity.name()
            ))),
            None => Err(self.unknown_field(name)),
        }
    }

    /// Write a relationship slot.
    pub fn set_related(&self, name: &str, slot: RelatedSlot) -> Result<()> {
        match self.entity.field_kind(name) {
            Some(FieldKind::Related) => {
                self.related
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set(name, slot);
                Ok(())
            }
            Some(_) => Err(Error::Custom(format!(
                "field '{}' on entity '{}' is a column, not a relationship",
                name,
                self.entity.name()
            ))),
            None => Err(self.unknown_field(name)),
        }
    }

    /// Read a relationship slot.
    pub fn related(&self, name: &str) -> Result<RelatedSlot> {
        match self.get(name)? {
            FieldValue::Related(slot) => Ok(slot),
            FieldValue::Column(_) => Err(Error::Custom(format!(
                "field '{}' on entity '{}' is a column, not a relationship",
                name,
                self.entity.name()
            ))),
        }
    }

    /// Whether the named relationship has been stitched.
    pub fn related_is_set(&self, name: &str) -> bool {
        self.related
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_set(name)
    }

    /// Mark the underlying row for deletion.
    pub fn mark_trash(&self) -> Result<()> {
        self.row
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .mark_trash()
    }

    fn unknown_field(&self, name: &str) -> Error {
        Error::field(
            FieldErrorKind::FieldDoesNotExist,
            format!("no field '{}' on entity '{}'", name, self.entity.name()),
        )
    }
}

/// An ordered collection of records.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an ordered list of records.
    #[must_use]
    pub fn from_vec(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get a record by position.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Iterate over the records in order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// View the records as a slice.
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
