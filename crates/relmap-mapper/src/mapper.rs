//! The per-entity mapper: the caller-facing fetch/write surface.

use crate::gateway::{TableGateway, UpdateStatus};
use crate::locator::{EntityConfig, MapperLocator};
use crate::record::{Record, RecordSet};
use crate::relation::eager::Eager;
use crate::relation::resolver;
use relmap_core::error::{Error, Result};
use relmap_core::row::SharedRow;
use relmap_core::value::Value;
use relmap_query::SelectBuilder;
use std::sync::Arc;

/// Fetches records, wraps rows, and writes records back for one entity
/// type. Obtained from [`MapperLocator::mapper`].
pub struct Mapper {
    entity: Arc<EntityConfig>,
    locator: Arc<MapperLocator>,
    gateway: TableGateway,
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("entity", &self.entity.name())
            .finish_non_exhaustive()
    }
}

impl Mapper {
    pub(crate) fn new(entity: Arc<EntityConfig>, locator: Arc<MapperLocator>) -> Self {
        let gateway = TableGateway::new(Arc::clone(&entity), Arc::clone(&locator));
        Self {
            entity,
            locator,
            gateway,
        }
    }

    /// The entity's registry name.
    pub fn name(&self) -> &str {
        self.entity.name()
    }

    /// The entity configuration.
    pub fn entity(&self) -> &Arc<EntityConfig> {
        &self.entity
    }

    /// The underlying table gateway.
    pub fn gateway(&self) -> &TableGateway {
        &self.gateway
    }

    /// A select handle over this entity's table, for further filtering
    /// before a fetch.
    pub fn select(&self) -> SelectBuilder {
        SelectBuilder::new(self.entity.table().table())
    }

    /// Build a fresh record from table defaults plus overrides.
    pub fn new_record(&self, overrides: &[(&str, Value)]) -> Result<Record> {
        let row = self.gateway.new_row(overrides)?.into_shared();
        Ok(self.wrap(row))
    }

    /// Fetch one record by primary key.
    pub fn fetch_record(&self, key: impl Into<Value>) -> Result<Option<Record>> {
        self.fetch_record_with(key, &Eager::none())
    }

    /// Fetch one record by primary key, eager-loading relationships.
    pub fn fetch_record_with(&self, key: impl Into<Value>, eager: &Eager) -> Result<Option<Record>> {
        let row = self.gateway.fetch_by_key(&key.into())?;
        let record = row.map(|r| self.wrap(r));
        if let Some(record) = &record {
            self.eager_load(std::slice::from_ref(record), eager)?;
        }
        Ok(record)
    }

    /// Fetch the first record matching a select.
    pub fn fetch_record_by(&self, select: SelectBuilder) -> Result<Option<Record>> {
        self.fetch_record_by_with(select, &Eager::none())
    }

    /// Fetch the first record matching a select, eager-loading
    /// relationships.
    pub fn fetch_record_by_with(
        &self,
        select: SelectBuilder,
        eager: &Eager,
    ) -> Result<Option<Record>> {
        let mut rows = self.gateway.select(select.limit(1))?;
        let record = if rows.is_empty() {
            None
        } else {
            Some(self.wrap(rows.swap_remove(0)))
        };
        if let Some(record) = &record {
            self.eager_load(std::slice::from_ref(record), eager)?;
        }
        Ok(record)
    }

    /// Fetch records for a batch of primary keys, in key order; absent
    /// keys are omitted.
    pub fn fetch_record_set(&self, keys: &[Value]) -> Result<RecordSet> {
        self.fetch_record_set_with(keys, &Eager::none())
    }

    /// Fetch records for a batch of primary keys, eager-loading
    /// relationships.
    pub fn fetch_record_set_with(&self, keys: &[Value], eager: &Eager) -> Result<RecordSet> {
        let rows = self.gateway.fetch_by_keys(keys)?;
        self.wrap_set(rows, eager)
    }

    /// Fetch every record matching a select.
    pub fn fetch_record_set_by(&self, select: SelectBuilder) -> Result<RecordSet> {
        self.fetch_record_set_by_with(select, &Eager::none())
    }

    /// Fetch every record matching a select, eager-loading
    /// relationships.
    pub fn fetch_record_set_by_with(&self, select: SelectBuilder, eager: &Eager) -> Result<RecordSet> {
        let rows = self.gateway.select(select)?;
        self.wrap_set(rows, eager)
    }

    /// Insert a record's row.
    pub fn insert(&self, record: &Record) -> Result<()> {
        self.check_entity(record)?;
        self.gateway.insert(record.row())
    }

    /// Update a record's row, sending only changed columns.
    pub fn update(&self, record: &Record) -> Result<UpdateStatus> {
        self.check_entity(record)?;
        self.gateway.update(record.row())
    }

    /// Delete a record's row.
    pub fn delete(&self, record: &Record) -> Result<()> {
        self.check_entity(record)?;
        self.gateway.delete(record.row())
    }

    fn wrap(&self, row: SharedRow) -> Record {
        Record::new(Arc::clone(&self.entity), row)
    }

    fn wrap_set(&self, rows: Vec<SharedRow>, eager: &Eager) -> Result<RecordSet> {
        let records: Vec<Record> = rows.into_iter().map(|r| self.wrap(r)).collect();
        self.eager_load(&records, eager)?;
        Ok(RecordSet::from_vec(records))
    }

    fn eager_load(&self, records: &[Record], eager: &Eager) -> Result<()> {
        if eager.is_empty() || records.is_empty() {
            return Ok(());
        }
        resolver::resolve_eager(&self.locator, records, eager)
    }

    fn check_entity(&self, record: &Record) -> Result<()> {
        if Arc::ptr_eq(record.entity(), &self.entity) {
            Ok(())
        } else {
            Err(Error::Custom(format!(
                "record belongs to entity '{}', not '{}'",
                record.entity().name(),
                self.entity.name()
            )))
        }
    }
}
