//! Table gateway: fetch/insert/update/delete orchestration for one
//! entity, owning get-or-create against the session's identity map.
//!
//! The gateway translates rows to and from raw column data and delegates
//! statement construction to the query builders and execution to the
//! connection provider. It never issues one query per requested row: key
//! batches collapse to a single `IN` fetch over the identity-map misses.

use crate::locator::{EntityConfig, MapperLocator};
use relmap_core::error::{Error, FieldErrorKind, IdentityErrorKind, Result};
use relmap_core::identity::{CanonValue, Identity, IdentityKey};
use relmap_core::row::{Row, RowStatus, SharedRow};
use relmap_core::value::Value;
use relmap_query::{DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError};

/// Outcome of an update: the three-way distinction between "nothing to
/// write", and "wrote one row". Failures are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The diff was empty; no statement was issued.
    NoChanges,
    /// Exactly one row was updated and the snapshot refreshed.
    Updated,
}

/// Per-entity storage orchestration.
#[derive(Clone)]
pub struct TableGateway {
    entity: Arc<EntityConfig>,
    locator: Arc<MapperLocator>,
}

impl TableGateway {
    /// Build the gateway for an entity.
    pub fn new(entity: Arc<EntityConfig>, locator: Arc<MapperLocator>) -> Self {
        Self { entity, locator }
    }

    /// The entity configuration.
    pub fn entity(&self) -> &Arc<EntityConfig> {
        &self.entity
    }

    fn table_name(&self) -> &str {
        self.entity.table().table()
    }

    /// Build a `New` row from table defaults plus overrides.
    pub fn new_row(&self, overrides: &[(&str, Value)]) -> Result<Row> {
        self.entity.table().new_row(overrides)
    }

    /// Fetch one row by scalar primary key, consulting the identity map
    /// first.
    #[tracing::instrument(level = "debug", skip(self, key), fields(table = %self.entity.table().table()))]
    pub fn fetch_by_key(&self, key: &Value) -> Result<Option<SharedRow>> {
        let table = self.entity.table();
        self.reject_composite()?;
        let id_key = IdentityKey::from_values(table.table(), std::slice::from_ref(key))?;
        if let Some(row) = self.locator.identity().lookup(&id_key) {
            tracing::trace!("identity-map hit, no query issued");
            return Ok(Some(row));
        }

        let key_col = &table.key_columns()[0];
        let select = SelectBuilder::new(table.table())
            .where_eq(key_col.clone(), key.clone())
            .limit(1);
        let mut rows = self.select(select)?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Fetch many rows by scalar primary key.
    ///
    /// Only identity-map misses are queried, in one `IN` statement;
    /// results merge back at their original key positions and absent
    /// keys are omitted (not an error).
    #[tracing::instrument(level = "debug", skip(self, keys), fields(table = %self.entity.table().table()))]
    pub fn fetch_by_keys(&self, keys: &[Value]) -> Result<Vec<SharedRow>> {
        let table = self.entity.table();
        self.reject_composite()?;
        let key_col = &table.key_columns()[0];

        let mut id_keys = Vec::with_capacity(keys.len());
        for key in keys {
            id_keys.push(IdentityKey::from_values(table.table(), std::slice::from_ref(key))?);
        }

        let mut seen = HashSet::new();
        let mut misses = Vec::new();
        {
            let identity = self.locator.identity();
            for (key, id_key) in keys.iter().zip(&id_keys) {
                if !identity.contains(id_key) && seen.insert(id_key.clone()) {
                    misses.push(key.clone());
                }
            }
        }

        if !misses.is_empty() {
            tracing::trace!(misses = misses.len(), "batch-fetching identity-map misses");
            let select = SelectBuilder::new(table.table()).where_in(key_col.clone(), misses);
            self.select(select)?;
        }

        let identity = self.locator.identity();
        Ok(id_keys.iter().filter_map(|k| identity.lookup(k)).collect())
    }

    /// Fetch many rows by (possibly composite) identities.
    ///
    /// Composite misses batch as one query with a per-column `IN`; the
    /// over-fetched combinations are filtered back out before
    /// registration.
    #[tracing::instrument(level = "debug", skip(self, identities), fields(table = %self.entity.table().table()))]
    pub fn fetch_by_identities(&self, identities: &[Identity]) -> Result<Vec<SharedRow>> {
        let table = self.entity.table();
        let mut id_keys = Vec::with_capacity(identities.len());
        for identity in identities {
            let key = identity.key(table.table()).ok_or_else(|| {
                Error::field(
                    FieldErrorKind::PrimaryKeyValueMissing,
                    format!(
                        "cannot fetch from '{}' with an incomplete primary key",
                        table.table()
                    ),
                )
            })?;
            id_keys.push(key);
        }

        let mut requested = HashSet::new();
        let mut misses: Vec<&Identity> = Vec::new();
        {
            let map = self.locator.identity();
            for (identity, id_key) in identities.iter().zip(&id_keys) {
                if !map.contains(id_key) && requested.insert(id_key.clone()) {
                    misses.push(identity);
                }
            }
        }

        if !misses.is_empty() {
            let mut select = SelectBuilder::new(table.table());
            for key_col in table.key_columns() {
                let mut distinct = HashSet::new();
                let mut values = Vec::new();
                for identity in &misses {
                    if let Some(value) = identity.get(key_col) {
                        if distinct.insert(CanonValue::from_value(value)) {
                            values.push(value.clone());
                        }
                    }
                }
                select = select.where_in(key_col.clone(), values);
            }

            let conn = self.locator.provider().read(table.table())?;
            let statement = select.build();
            let results = conn.query(&statement.sql, &statement.params)?;
            for result in &results {
                let row = table.row_from_result(result)?;
                let row_key = row.identity_key().ok_or_else(|| {
                    Error::field(
                        FieldErrorKind::PrimaryKeyValueMissing,
                        format!("fetched row for '{}' lacks its key", table.table()),
                    )
                })?;
                // Per-column IN over-fetches on composite keys; keep
                // only the requested combinations.
                if requested.contains(&row_key) {
                    self.get_or_register(row)?;
                }
            }
        }

        let map = self.locator.identity();
        Ok(id_keys.iter().filter_map(|k| map.lookup(k)).collect())
    }

    /// Run a select and materialize each row through the identity map.
    ///
    /// A returned row whose identity is already mapped yields the
    /// existing instance untouched; fresh rows register as `Clean`.
    #[tracing::instrument(level = "debug", skip(self, select), fields(table = %self.entity.table().table()))]
    pub fn select(&self, select: SelectBuilder) -> Result<Vec<SharedRow>> {
        let table = self.entity.table();
        let conn = self.locator.provider().read(table.table())?;
        let statement = select.build();
        tracing::trace!(sql = %statement.sql, "executing select");
        let results = conn.query(&statement.sql, &statement.params)?;

        let mut rows = Vec::with_capacity(results.len());
        for result in &results {
            let row = table.row_from_result(result)?;
            rows.push(self.get_or_register(row)?);
        }
        Ok(rows)
    }

    /// Insert a `New` row on the entity's write connection.
    pub fn insert(&self, row: &SharedRow) -> Result<()> {
        let conn = self.locator.provider().write(self.table_name())?;
        self.insert_on(conn.as_ref(), row)
    }

    /// Insert a `New` row on the given connection.
    ///
    /// On success the row becomes `Inserted`, a deferred autoincrement
    /// key is assigned, and the row registers in the identity map with a
    /// fresh snapshot.
    #[tracing::instrument(level = "debug", skip(self, conn, row), fields(table = %self.entity.table().table()))]
    pub fn insert_on(&self, conn: &dyn relmap_core::Connection, row: &SharedRow) -> Result<()> {
        let table = self.entity.table();
        let mut builder = InsertBuilder::new(table.table());
        {
            let guard = row.read().unwrap_or_else(PoisonError::into_inner);
            if guard.status() != RowStatus::New {
                return Err(Error::Custom(format!(
                    "cannot insert a row with status '{}'",
                    guard.status().as_str()
                )));
            }
            for key_col in table.key_columns() {
                match guard.identity().get(key_col) {
                    Some(value) => builder = builder.value(key_col.clone(), value.clone()),
                    None if table.is_autoincrement() => {}
                    None => {
                        return Err(Error::field(
                            FieldErrorKind::PrimaryKeyValueMissing,
                            format!(
                                "insert into '{}' requires a value for key column '{}'",
                                table.table(),
                                key_col
                            ),
                        ));
                    }
                }
            }
            for col in table.columns() {
                let value = guard.get(col.name()).cloned().unwrap_or(Value::Null);
                builder = builder.value(col.name().to_string(), value);
            }
        }

        let statement = builder.build();
        tracing::trace!(sql = %statement.sql, "executing insert");
        let affected = conn.execute(&statement.sql, &statement.params)?;
        if affected != 1 {
            self.mark_failed(row);
            return Err(Error::unexpected_rows(table.table(), 1, affected));
        }

        {
            let mut guard = row.write().unwrap_or_else(PoisonError::into_inner);
            if table.is_autoincrement() && !guard.identity().is_complete() {
                let generated = conn.last_insert_id()?.ok_or_else(|| {
                    Error::field(
                        FieldErrorKind::PrimaryKeyValueMissing,
                        format!(
                            "database returned no generated key for '{}'",
                            table.table()
                        ),
                    )
                })?;
                let key_col = table.key_columns()[0].clone();
                guard.set_identity_value(&key_col, generated)?;
            }
            guard.set_status(RowStatus::Inserted);
        }
        self.locator.identity().register(row)
    }

    /// Update a row on the entity's write connection.
    pub fn update(&self, row: &SharedRow) -> Result<UpdateStatus> {
        let conn = self.locator.provider().write(self.table_name())?;
        self.update_on(conn.as_ref(), row)
    }

    /// Update a row on the given connection, sending only changed
    /// columns.
    ///
    /// An empty diff is an explicit no-op: no statement is issued and
    /// [`UpdateStatus::NoChanges`] is returned.
    #[tracing::instrument(level = "debug", skip(self, conn, row), fields(table = %self.entity.table().table()))]
    pub fn update_on(
        &self,
        conn: &dyn relmap_core::Connection,
        row: &SharedRow,
    ) -> Result<UpdateStatus> {
        let table = self.entity.table();
        self.reject_frozen(row, "update")?;

        let diff = self.locator.identity().diff(row)?;
        if diff.is_empty() {
            tracing::trace!("empty diff, skipping update");
            return Ok(UpdateStatus::NoChanges);
        }

        let mut builder = UpdateBuilder::new(table.table());
        let mut changed: Vec<_> = diff.into_iter().collect();
        changed.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (column, value) in changed {
            builder = builder.set(column, value);
        }
        {
            let guard = row.read().unwrap_or_else(PoisonError::into_inner);
            builder = self.key_criteria(&guard, builder, |b, c, v| b.where_eq(c, v))?;
        }

        let statement = builder.build();
        tracing::trace!(sql = %statement.sql, "executing update");
        let affected = conn.execute(&statement.sql, &statement.params)?;
        if affected != 1 {
            self.mark_failed(row);
            return Err(Error::unexpected_rows(table.table(), 1, affected));
        }

        self.locator.identity().refresh_snapshot(row)?;
        row.write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_status(RowStatus::Updated);
        Ok(UpdateStatus::Updated)
    }

    /// Delete a row on the entity's write connection.
    pub fn delete(&self, row: &SharedRow) -> Result<()> {
        let conn = self.locator.provider().write(self.table_name())?;
        self.delete_on(conn.as_ref(), row)
    }

    /// Delete a row on the given connection.
    ///
    /// Deleting an already-`Deleted` row is forbidden.
    #[tracing::instrument(level = "debug", skip(self, conn, row), fields(table = %self.entity.table().table()))]
    pub fn delete_on(&self, conn: &dyn relmap_core::Connection, row: &SharedRow) -> Result<()> {
        let table = self.entity.table();
        self.reject_frozen(row, "delete")?;

        let mut builder = DeleteBuilder::new(table.table());
        {
            let guard = row.read().unwrap_or_else(PoisonError::into_inner);
            builder = self.key_criteria(&guard, builder, |b, c, v| b.where_eq(c, v))?;
        }

        let statement = builder.build();
        tracing::trace!(sql = %statement.sql, "executing delete");
        let affected = conn.execute(&statement.sql, &statement.params)?;
        if affected != 1 {
            self.mark_failed(row);
            return Err(Error::unexpected_rows(table.table(), 1, affected));
        }

        row.write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_status(RowStatus::Deleted);
        Ok(())
    }

    /// Return the mapped instance for this identity, registering the
    /// given row if the identity is new to the session.
    fn get_or_register(&self, row: Row) -> Result<SharedRow> {
        let key = row.identity_key().ok_or_else(|| {
            Error::field(
                FieldErrorKind::PrimaryKeyValueMissing,
                format!(
                    "row in table '{}' has no complete primary key",
                    row.table()
                ),
            )
        })?;
        let mut map = self.locator.identity();
        if let Some(existing) = map.lookup(&key) {
            return Ok(existing);
        }
        let shared = row.into_shared();
        map.register(&shared)?;
        Ok(shared)
    }

    fn key_criteria<B>(
        &self,
        row: &Row,
        mut builder: B,
        mut where_eq: impl FnMut(B, String, Value) -> B,
    ) -> Result<B> {
        let table = self.entity.table();
        for key_col in table.key_columns() {
            let value = row.identity().get(key_col).ok_or_else(|| {
                Error::field(
                    FieldErrorKind::PrimaryKeyValueMissing,
                    format!(
                        "write to '{}' requires a value for key column '{}'",
                        table.table(),
                        key_col
                    ),
                )
            })?;
            builder = where_eq(builder, key_col.clone(), value.clone());
        }
        Ok(builder)
    }

    fn reject_frozen(&self, row: &SharedRow, what: &str) -> Result<()> {
        let guard = row.read().unwrap_or_else(PoisonError::into_inner);
        if guard.is_mutable() {
            Ok(())
        } else {
            Err(Error::identity(
                IdentityErrorKind::ImmutableOnceDeleted,
                format!(
                    "row in table '{}' is already deleted; cannot {}",
                    guard.table(),
                    what
                ),
            ))
        }
    }

    fn mark_failed(&self, row: &SharedRow) {
        row.write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_status(RowStatus::Failed);
    }

    fn reject_composite(&self) -> Result<()> {
        if self.entity.table().has_composite_key() {
            return Err(Error::field(
                FieldErrorKind::CompositeKeyNotProvided,
                format!(
                    "table '{}' has a composite key; fetch it by identity or criteria",
                    self.entity.table().table()
                ),
            ));
        }
        Ok(())
    }
}
