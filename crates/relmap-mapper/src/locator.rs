//! Entity configuration and the session-scoped mapper locator.
//!
//! Every entity type is described by an explicit [`EntityConfig`] built
//! at startup: its table shape, its relationships, and a field registry
//! that classifies each accessible name once, so record field access is
//! a typed dispatch instead of runtime string probing. The
//! [`MapperLocator`] owns the config registry, the connection provider,
//! and the session's identity map (arena-style: rows and records hold
//! handles into it, never copies).

use crate::identity_map::IdentityMap;
use crate::mapper::Mapper;
use crate::relation::Relation;
use relmap_core::connection::ConnectionProvider;
use relmap_core::error::{Error, RelationErrorKind, Result};
use relmap_core::table::TableInfo;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// How a field name on a record resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A primary-key column on the row
    Key,
    /// A data column on the row
    Column,
    /// A named relationship slot in the related bag
    Related,
}

/// Configuration for one entity type: registry name, table shape,
/// relationship definitions, and the precomputed field registry.
#[derive(Debug)]
pub struct EntityConfig {
    name: String,
    table: TableInfo,
    relations: Vec<Relation>,
    fields: HashMap<String, FieldKind>,
}

impl EntityConfig {
    /// Start an entity definition.
    pub fn new(name: impl Into<String>, table: TableInfo) -> Self {
        let mut fields = HashMap::new();
        for key_col in table.key_columns() {
            fields.insert(key_col.clone(), FieldKind::Key);
        }
        for col in table.columns() {
            fields.insert(col.name().to_string(), FieldKind::Column);
        }
        Self {
            name: name.into(),
            table,
            relations: Vec::new(),
            fields,
        }
    }

    /// Add a relationship definition.
    #[must_use]
    pub fn relation(mut self, relation: Relation) -> Self {
        self.fields
            .insert(relation.name().to_string(), FieldKind::Related);
        self.relations.push(relation);
        self
    }

    /// The registry name of this entity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table configuration.
    pub fn table(&self) -> &TableInfo {
        &self.table
    }

    /// The relationship definitions.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Find a relationship by name.
    pub fn find_relation(&self, name: &str) -> Result<&Relation> {
        self.relations
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| {
                Error::relation(
                    RelationErrorKind::RelationDoesNotExist,
                    format!("no relationship '{}' on entity '{}'", name, self.name),
                )
            })
    }

    /// Classify a field name (None if unknown).
    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).copied()
    }
}

/// The session object: connection provider, entity registry, and the
/// identity map scoped to this session.
pub struct MapperLocator {
    provider: Arc<dyn ConnectionProvider>,
    entities: HashMap<String, Arc<EntityConfig>>,
    identity: Mutex<IdentityMap>,
}

impl MapperLocator {
    /// Create a locator over the given provider.
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Self {
            provider,
            entities: HashMap::new(),
            identity: Mutex::new(IdentityMap::new()),
        }
    }

    /// Register an entity configuration.
    #[must_use]
    pub fn entity(mut self, config: EntityConfig) -> Self {
        self.entities
            .insert(config.name().to_string(), Arc::new(config));
        self
    }

    /// The connection provider.
    pub fn provider(&self) -> &Arc<dyn ConnectionProvider> {
        &self.provider
    }

    /// Look up an entity configuration by registry name.
    pub fn config(&self, name: &str) -> Result<Arc<EntityConfig>> {
        self.entities.get(name).map(Arc::clone).ok_or_else(|| {
            Error::relation(
                RelationErrorKind::ForeignMapperMissing,
                format!("no mapper registered for entity '{}'", name),
            )
        })
    }

    /// Build the mapper for an entity.
    pub fn mapper(self: &Arc<Self>, name: &str) -> Result<Mapper> {
        let entity = self.config(name)?;
        Ok(Mapper::new(entity, Arc::clone(self)))
    }

    /// Lock the session's identity map.
    pub fn identity(&self) -> MutexGuard<'_, IdentityMap> {
        self.identity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::Relation;
    use crate::testing::MockProvider;
    use relmap_core::value::Value;

    fn thread_config() -> EntityConfig {
        let table = TableInfo::new("threads")
            .key("thread_id")
            .autoincrement(true)
            .column("subject", Value::Null);
        EntityConfig::new("thread", table).relation(Relation::one_to_many("replies", "reply"))
    }

    #[test]
    fn test_field_registry_classifies_names() {
        let config = thread_config();
        assert_eq!(config.field_kind("thread_id"), Some(FieldKind::Key));
        assert_eq!(config.field_kind("subject"), Some(FieldKind::Column));
        assert_eq!(config.field_kind("replies"), Some(FieldKind::Related));
        assert_eq!(config.field_kind("nope"), None);
    }

    #[test]
    fn test_find_relation() {
        let config = thread_config();
        assert!(config.find_relation("replies").is_ok());

        let err = config.find_relation("missing").unwrap_err();
        assert!(matches!(
            err,
            Error::Relation(ref e) if e.kind == RelationErrorKind::RelationDoesNotExist
        ));
    }

    #[test]
    fn test_locator_unknown_entity() {
        let provider = MockProvider::shared();
        let locator = Arc::new(MapperLocator::new(provider).entity(thread_config()));

        assert!(locator.mapper("thread").is_ok());
        let err = locator.mapper("ghost").unwrap_err();
        assert!(matches!(
            err,
            Error::Relation(ref e) if e.kind == RelationErrorKind::ForeignMapperMissing
        ));
    }
}
