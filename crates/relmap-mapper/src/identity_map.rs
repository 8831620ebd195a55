//! Identity Map: at most one in-memory row per row identity.
//!
//! The map guarantees that every fetch path (by key, by criteria, via
//! relationship stitching) hands back the *same* [`SharedRow`] for the
//! same underlying database row, so a mutation made through one handle
//! is visible through every other. Alongside each row it keeps the
//! "initial" column snapshot the row had when it was registered (or
//! after its last successful write), which is what updates diff against.

use relmap_core::error::{Error, FieldErrorKind, IdentityErrorKind, Result};
use relmap_core::identity::IdentityKey;
use relmap_core::row::SharedRow;
use relmap_core::value::Value;
use std::collections::HashMap;
use std::sync::PoisonError;

/// Per-session store of rows and their as-loaded snapshots.
#[derive(Default)]
pub struct IdentityMap {
    rows: HashMap<IdentityKey, SharedRow>,
    snapshots: HashMap<IdentityKey, HashMap<String, Value>>,
}

impl IdentityMap {
    /// Create a new empty identity map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a row and capture its current values as the initial
    /// snapshot.
    ///
    /// Fails with `RowAlreadyMapped` if the identity is already present
    /// and with `PrimaryKeyValueMissing` if the row's identity is
    /// incomplete.
    pub fn register(&mut self, row: &SharedRow) -> Result<()> {
        let guard = row.read().unwrap_or_else(PoisonError::into_inner);
        let key = guard.identity_key().ok_or_else(|| {
            Error::field(
                FieldErrorKind::PrimaryKeyValueMissing,
                format!(
                    "cannot register a row in table '{}' without a complete primary key",
                    guard.table()
                ),
            )
        })?;
        if self.rows.contains_key(&key) {
            return Err(Error::identity(
                IdentityErrorKind::RowAlreadyMapped,
                format!("a row for table '{}' is already mapped", guard.table()),
            ));
        }
        let snapshot = guard.snapshot();
        drop(guard);
        tracing::trace!(table = key.table(), "registering row in identity map");
        self.snapshots.insert(key.clone(), snapshot);
        self.rows.insert(key, SharedRow::clone(row));
        Ok(())
    }

    /// Look up a row by identity key. O(1); absent is `None`, not an
    /// error.
    #[must_use]
    pub fn lookup(&self, key: &IdentityKey) -> Option<SharedRow> {
        self.rows.get(key).map(SharedRow::clone)
    }

    /// Whether the given identity is mapped.
    #[must_use]
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.rows.contains_key(key)
    }

    /// Overwrite the stored snapshot with the row's current values.
    ///
    /// Called after a successful insert or update so the next diff is
    /// computed against post-write state. Fails with `RowNotMapped` if
    /// the row was never registered.
    pub fn refresh_snapshot(&mut self, row: &SharedRow) -> Result<()> {
        let guard = row.read().unwrap_or_else(PoisonError::into_inner);
        let key = self.mapped_key_for(&guard)?;
        let snapshot = guard.snapshot();
        drop(guard);
        tracing::trace!(table = key.table(), "refreshing identity-map snapshot");
        self.snapshots.insert(key, snapshot);
        Ok(())
    }

    /// The columns whose current value differs from the initial
    /// snapshot, with their current values.
    ///
    /// Comparison is loose for numeric representations (`"1"` equals
    /// `1`) and exact otherwise. Fails with `RowNotMapped` if the row
    /// was never registered.
    pub fn diff(&self, row: &SharedRow) -> Result<HashMap<String, Value>> {
        let guard = row.read().unwrap_or_else(PoisonError::into_inner);
        let key = self.mapped_key_for(&guard)?;
        let snapshot = &self.snapshots[&key];

        let mut changed = HashMap::new();
        for (column, current) in guard.data() {
            let same = snapshot
                .get(column)
                .is_some_and(|initial| initial.loosely_equals(current));
            if !same {
                changed.insert(column.clone(), current.clone());
            }
        }
        Ok(changed)
    }

    /// Number of mapped rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn mapped_key_for(&self, row: &relmap_core::Row) -> Result<IdentityKey> {
        let key = row.identity_key().ok_or_else(|| {
            Error::identity(
                IdentityErrorKind::RowNotMapped,
                format!(
                    "row in table '{}' has an incomplete key and was never mapped",
                    row.table()
                ),
            )
        })?;
        if !self.snapshots.contains_key(&key) {
            return Err(Error::identity(
                IdentityErrorKind::RowNotMapped,
                format!("row in table '{}' is not in the identity map", row.table()),
            ));
        }
        Ok(key)
    }
}
