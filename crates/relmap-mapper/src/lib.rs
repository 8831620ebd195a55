//! Identity map, relationship resolution, and unit-of-work for the
//! relmap data mapper.
//!
//! This crate is the heart of the system:
//!
//! - [`IdentityMap`] guarantees one in-memory row per row identity and
//!   keeps the as-loaded snapshot updates diff against.
//! - [`TableGateway`] orchestrates fetch/insert/update/delete for one
//!   entity, batching key fetches over identity-map misses.
//! - [`Record`] is the entity façade: one shared row plus a bag of
//!   eagerly-stitched relationships.
//! - The [`relation`] module defines relationships declaratively and
//!   stitches them in batches: one query per relationship per
//!   eager-load request, never one per row.
//! - [`TransactionPlan`] executes an ordered batch of single-use work
//!   items atomically across every write connection they touch.
//!
//! Everything session-scoped (identity map, entity registry, provider)
//! is owned by one [`MapperLocator`]; rows and records hold shared
//! handles into it.

pub mod gateway;
pub mod identity_map;
pub mod locator;
pub mod mapper;
pub mod record;
pub mod relation;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

pub use gateway::{TableGateway, UpdateStatus};
pub use identity_map::IdentityMap;
pub use locator::{EntityConfig, FieldKind, MapperLocator};
pub use mapper::Mapper;
pub use record::{FieldValue, Record, RecordSet, Related, RelatedSlot};
pub use relation::eager::{Eager, EagerSpec, TuneFn};
pub use relation::resolver::{resolve, resolve_eager};
pub use relation::{ColumnPairing, Relation, RelationKind};
pub use transaction::{PlanState, TransactionPlan, WorkItem, WorkKind};
