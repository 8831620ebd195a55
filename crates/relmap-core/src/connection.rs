//! Database connection contracts.
//!
//! These are the collaborator traits the mapper core consumes; concrete
//! drivers live outside this workspace. Everything here is synchronous:
//! each call blocks until the database answers, and the core sequences
//! its work (diffing, stitching, committing) on that assumption. Async
//! callers wrap at the boundary, not inside the core.

use crate::error::Result;
use crate::result::ResultRow;
use crate::value::Value;
use std::sync::Arc;

/// A database connection capable of executing statements.
///
/// Implementations must serialize internal access themselves (the usual
/// shape is a handle around a mutex-guarded native connection).
pub trait Connection: Send + Sync {
    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultRow>>;

    /// Execute a statement (INSERT, UPDATE, DELETE) and return rows
    /// affected.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// The id generated by the most recent INSERT, if the database
    /// produced one.
    fn last_insert_id(&self) -> Result<Option<Value>>;

    /// Begin a transaction.
    fn begin(&self) -> Result<()>;

    /// Commit the current transaction.
    fn commit(&self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback(&self) -> Result<()>;

    /// Whether a transaction is currently open.
    fn in_transaction(&self) -> bool;
}

/// Hands out connections per table.
///
/// Implementations decide read/write splitting and connection reuse; the
/// core only requires that the same logical write connection is returned
/// consistently for a table for the lifetime of a session, so that a
/// transaction plan can group its work by connection identity.
pub trait ConnectionProvider: Send + Sync {
    /// The connection used to read from the given table.
    fn read(&self, table: &str) -> Result<Arc<dyn Connection>>;

    /// The connection used to write to the given table.
    fn write(&self, table: &str) -> Result<Arc<dyn Connection>>;
}
