//! Declarative relationship definitions.
//!
//! Relationships are configured once per native entity and immutable
//! afterwards. Column names may be left implicit: they lazily resolve
//! from the relevant table's primary key on first use and are cached.

pub mod eager;
pub mod resolver;

use relmap_core::error::{Error, Result};
use relmap_core::table::TableInfo;
use relmap_core::value::Value;
use std::sync::OnceLock;

/// The kind of relationship between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One native row owns at most one foreign row.
    OneToOne,
    /// One native row owns many foreign rows.
    OneToMany,
    /// Many native rows point at one foreign row.
    ManyToOne,
    /// Many-to-many through an already-stitched join relationship.
    ManyToMany,
    /// The target definition is chosen per row by a discriminator
    /// column.
    Variant,
}

/// The resolved native/foreign column pairing for a relationship.
#[derive(Debug, Clone)]
pub struct ColumnPairing {
    /// Columns on the native side (for through-relationships, on the
    /// join rows).
    pub native: Vec<String>,
    /// Columns on the foreign (target) side.
    pub foreign: Vec<String>,
}

/// One declarative relationship definition.
#[derive(Debug)]
pub struct Relation {
    name: String,
    kind: RelationKind,
    foreign_entity: String,
    native_cols: Vec<String>,
    foreign_cols: Vec<String>,
    through: Option<String>,
    discriminator: Option<String>,
    arms: Vec<(Value, Relation)>,
    resolved: OnceLock<ColumnPairing>,
}

impl Relation {
    fn new(name: impl Into<String>, kind: RelationKind, foreign_entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            foreign_entity: foreign_entity.into(),
            native_cols: Vec::new(),
            foreign_cols: Vec::new(),
            through: None,
            discriminator: None,
            arms: Vec::new(),
            resolved: OnceLock::new(),
        }
    }

    /// A one-to-one relationship to the given entity.
    pub fn one_to_one(name: impl Into<String>, foreign_entity: impl Into<String>) -> Self {
        Self::new(name, RelationKind::OneToOne, foreign_entity)
    }

    /// A one-to-many relationship to the given entity.
    pub fn one_to_many(name: impl Into<String>, foreign_entity: impl Into<String>) -> Self {
        Self::new(name, RelationKind::OneToMany, foreign_entity)
    }

    /// A many-to-one relationship to the given entity.
    pub fn many_to_one(name: impl Into<String>, foreign_entity: impl Into<String>) -> Self {
        Self::new(name, RelationKind::ManyToOne, foreign_entity)
    }

    /// A many-to-many relationship resolved through an already-stitched
    /// join relationship on the native entity.
    pub fn many_to_many(
        name: impl Into<String>,
        foreign_entity: impl Into<String>,
        through: impl Into<String>,
    ) -> Self {
        let mut relation = Self::new(name, RelationKind::ManyToMany, foreign_entity);
        relation.through = Some(through.into());
        relation
    }

    /// A discriminator-dispatched relationship: the concrete definition
    /// is chosen per native row by the value of `discriminator`.
    pub fn variant(name: impl Into<String>, discriminator: impl Into<String>) -> Self {
        let mut relation = Self::new(name, RelationKind::Variant, String::new());
        relation.discriminator = Some(discriminator.into());
        relation
    }

    /// Pair a native column with a foreign column. Call once per
    /// component for composite pairings; order is significant.
    ///
    /// For through-relationships, the native column lives on the join
    /// rows.
    #[must_use]
    pub fn on(mut self, native_col: impl Into<String>, foreign_col: impl Into<String>) -> Self {
        self.native_cols.push(native_col.into());
        self.foreign_cols.push(foreign_col.into());
        self
    }

    /// Register a sub-definition for one discriminator value.
    #[must_use]
    pub fn arm(mut self, value: impl Into<Value>, relation: Relation) -> Self {
        self.arms.push((value.into(), relation));
        self
    }

    /// The relationship name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The relationship kind.
    pub const fn kind(&self) -> RelationKind {
        self.kind
    }

    /// The registry name of the target entity (empty for variants).
    pub fn foreign_entity(&self) -> &str {
        &self.foreign_entity
    }

    /// The join relationship name (many-to-many only).
    pub fn through(&self) -> Option<&str> {
        self.through.as_deref()
    }

    /// The discriminator column (variants only).
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// The variant sub-definitions.
    pub fn arms(&self) -> &[(Value, Relation)] {
        &self.arms
    }

    /// Resolve the native/foreign column pairing, defaulting from the
    /// relevant table's primary key; the result is computed once and
    /// cached.
    pub fn resolve_columns(
        &self,
        native_table: &TableInfo,
        foreign_table: &TableInfo,
    ) -> Result<&ColumnPairing> {
        if let Some(pairing) = self.resolved.get() {
            return Ok(pairing);
        }
        let pairing = self.compute_pairing(native_table, foreign_table)?;
        Ok(self.resolved.get_or_init(|| pairing))
    }

    fn compute_pairing(
        &self,
        native_table: &TableInfo,
        foreign_table: &TableInfo,
    ) -> Result<ColumnPairing> {
        if self.kind == RelationKind::Variant {
            return Err(Error::Custom(format!(
                "relationship '{}' dispatches by discriminator and has no columns of its own",
                self.name
            )));
        }
        if !self.native_cols.is_empty() {
            if self.native_cols.len() != self.foreign_cols.len() {
                return Err(Error::Custom(format!(
                    "relationship '{}' pairs {} native column(s) with {} foreign column(s)",
                    self.name,
                    self.native_cols.len(),
                    self.foreign_cols.len()
                )));
            }
            return Ok(ColumnPairing {
                native: self.native_cols.clone(),
                foreign: self.foreign_cols.clone(),
            });
        }
        // Default column names come from a primary key: the foreign
        // table's for many-to-one and through-relationships (the native
        // side carries the target's key columns), the native table's for
        // one-to-one/one-to-many (the foreign side points back).
        let pairing = match self.kind {
            RelationKind::ManyToOne | RelationKind::ManyToMany => ColumnPairing {
                native: foreign_table.key_columns().to_vec(),
                foreign: foreign_table.key_columns().to_vec(),
            },
            RelationKind::OneToOne | RelationKind::OneToMany => ColumnPairing {
                native: native_table.key_columns().to_vec(),
                foreign: native_table.key_columns().to_vec(),
            },
            RelationKind::Variant => unreachable!("handled above"),
        };
        Ok(pairing)
    }
}
