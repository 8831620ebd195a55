//! Parameterized SQL statement construction for the relmap data mapper.
//!
//! This crate implements the "query builder" collaborator contract:
//! given a table name and criteria (column → scalar / list / null), it
//! produces parameterized SELECT/INSERT/UPDATE/DELETE statements. Array
//! criteria compile to `IN` predicates, null to `IS NULL`, scalars to
//! equality. It builds SQL text only; execution belongs to a
//! [`Connection`](relmap_core::Connection).

pub mod builder;
pub mod expr;
pub mod select;

pub use builder::{DeleteBuilder, InsertBuilder, UpdateBuilder};
pub use expr::{Dialect, Statement, Term, quote_ident};
pub use select::SelectBuilder;
