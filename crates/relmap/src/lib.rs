//! relmap: a data-mapper persistence core.
//!
//! relmap turns relational rows into in-memory domain objects, tracks
//! their mutation state, resolves object graphs across foreign-key
//! relationships, and commits batches of pending writes as all-or-
//! nothing units of work. Three pieces carry the weight:
//!
//! - the **identity map**: at most one in-memory row per row identity,
//!   with as-loaded snapshots for change diffing;
//! - the **relationship resolution engine**: batched fetch-and-stitch
//!   for one-to-one, one-to-many, many-to-one, many-to-many-through,
//!   and discriminator-dispatched relationships: one query per
//!   relationship per eager load, never one per row;
//! - the **transaction planner**: an ordered, once-executable batch of
//!   single-use work items, committed or rolled back atomically across
//!   every write connection touched.
//!
//! SQL text construction lives in [`relmap_query`]; actual database I/O
//! is behind the [`Connection`]/[`ConnectionProvider`] traits and is
//! supplied by the caller.
//!
//! # Example
//!
//! ```ignore
//! let locator = Arc::new(
//!     MapperLocator::new(provider)
//!         .entity(
//!             EntityConfig::new(
//!                 "thread",
//!                 TableInfo::new("threads")
//!                     .key("thread_id")
//!                     .autoincrement(true)
//!                     .column("subject", Value::Null),
//!             )
//!             .relation(Relation::one_to_many("replies", "reply")),
//!         )
//!         .entity(EntityConfig::new("reply", replies_table)),
//! );
//!
//! let threads = locator.mapper("thread")?;
//! let thread = threads
//!     .fetch_record_with(Value::Int(1), &Eager::with(["replies"]))?
//!     .expect("thread 1 exists");
//!
//! thread.set("subject", Value::Text("renamed".into()))?;
//! let mut plan = TransactionPlan::new(Arc::clone(&locator));
//! plan.update(thread)?;
//! assert!(plan.exec()?);
//! ```

pub use relmap_core::{
    ColumnDef, ColumnSet, Connection, ConnectionProvider, Error, FieldErrorKind, FromValue,
    Identity, IdentityErrorKind, IdentityKey, QueryError, QueryErrorKind, RelationErrorKind,
    Result, ResultRow, Row, RowStatus, SharedRow, TableInfo, TransactionErrorKind, Value,
    WriteError,
};

pub use relmap_query::{
    DeleteBuilder, Dialect, InsertBuilder, SelectBuilder, Statement, Term, UpdateBuilder,
    quote_ident,
};

pub use relmap_mapper::{
    Eager, EagerSpec, EntityConfig, FieldKind, FieldValue, IdentityMap, Mapper, MapperLocator,
    PlanState, Record, RecordSet, Related, RelatedSlot, Relation, RelationKind, TableGateway,
    TransactionPlan, UpdateStatus, WorkItem, WorkKind, resolve, resolve_eager,
};

/// The commonly-needed surface, importable in one line.
pub mod prelude {
    pub use relmap_core::{
        Connection, ConnectionProvider, Error, Identity, Result, Row, RowStatus, SharedRow,
        TableInfo, Value,
    };
    pub use relmap_mapper::{
        Eager, EntityConfig, Mapper, MapperLocator, Record, RecordSet, RelatedSlot, Relation,
        TransactionPlan, UpdateStatus,
    };
    pub use relmap_query::SelectBuilder;
}
