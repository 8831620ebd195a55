//! Core types and traits for the relmap data mapper.
//!
//! This crate provides the foundational abstractions the mapper layers
//! build on:
//!
//! - [`Value`]: dynamically-typed column values with tolerant numeric
//!   comparison
//! - [`Identity`] / [`IdentityKey`]: write-once primary-key identities
//!   and their structural map keys
//! - [`Row`] / [`RowStatus`]: the entity row and its mutation state
//!   machine
//! - [`TableInfo`]: explicit per-entity storage configuration
//! - [`Connection`] / [`ConnectionProvider`]: the synchronous storage
//!   collaborator contracts
//! - [`Error`] / [`Result`]: the error taxonomy shared across crates

pub mod connection;
pub mod error;
pub mod identity;
pub mod result;
pub mod row;
pub mod table;
pub mod value;

pub use connection::{Connection, ConnectionProvider};
pub use error::{
    Error, FieldErrorKind, IdentityErrorKind, QueryError, QueryErrorKind, RelationErrorKind,
    Result, TransactionErrorKind, WriteError,
};
pub use identity::{CanonValue, Identity, IdentityKey};
pub use result::{ColumnSet, FromValue, ResultRow};
pub use row::{Row, RowStatus, SharedRow};
pub use table::{ColumnDef, TableInfo};
pub use value::Value;
