//! Builders for INSERT, UPDATE, DELETE statements.

use crate::expr::{Dialect, Statement, Term, quote_ident, render_criteria};
use relmap_core::Value;

/// INSERT statement builder.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<(String, Value)>,
}

impl InsertBuilder {
    /// Start an INSERT into the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column value.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: Value) -> Self {
        self.columns.push((column.into(), value));
        self
    }

    /// Add many column values at once, preserving order.
    #[must_use]
    pub fn values<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.columns
            .extend(columns.into_iter().map(|(c, v)| (c.into(), v)));
        self
    }

    /// Drop columns still at NULL, used for autoincrement keys the
    /// database generates.
    #[must_use]
    pub fn skip_null(mut self, column: &str) -> Self {
        self.columns
            .retain(|(c, v)| !(c == column && v.is_null()));
        self
    }

    /// Build with the default dialect.
    pub fn build(&self) -> Statement {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the INSERT SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Statement {
        let names: Vec<String> = self.columns.iter().map(|(c, _)| quote_ident(c)).collect();
        let params: Vec<Value> = self.columns.iter().map(|(_, v)| v.clone()).collect();
        let placeholders: Vec<String> = (1..=params.len())
            .map(|i| dialect.placeholder(i))
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&self.table),
            names.join(", "),
            placeholders.join(", ")
        );
        Statement { sql, params }
    }
}

/// UPDATE statement builder: explicit SET list keyed by criteria.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    set: Vec<(String, Value)>,
    criteria: Vec<(String, Term)>,
}

impl UpdateBuilder {
    /// Start an UPDATE against the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            criteria: Vec::new(),
        }
    }

    /// Add a SET column.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set.push((column.into(), value));
        self
    }

    /// Key the update by a column value.
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.criteria.push((column.into(), Term::from(value)));
        self
    }

    /// Whether any SET columns were added.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Build with the default dialect.
    pub fn build(&self) -> Statement {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the UPDATE SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Statement {
        let mut params = Vec::new();
        let assignments: Vec<String> = self
            .set
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{} = {}", quote_ident(column), dialect.placeholder(params.len()))
            })
            .collect();

        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_ident(&self.table),
            assignments.join(", ")
        );
        if let Some(body) = render_criteria(&self.criteria, dialect, &mut params) {
            sql.push_str(" WHERE ");
            sql.push_str(&body);
        }
        Statement { sql, params }
    }
}

/// DELETE statement builder.
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    criteria: Vec<(String, Term)>,
}

impl DeleteBuilder {
    /// Start a DELETE against the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            criteria: Vec::new(),
        }
    }

    /// Key the delete by a column value.
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.criteria.push((column.into(), Term::from(value)));
        self
    }

    /// Build with the default dialect.
    pub fn build(&self) -> Statement {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the DELETE SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Statement {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", quote_ident(&self.table));
        if let Some(body) = render_criteria(&self.criteria, dialect, &mut params) {
            sql.push_str(" WHERE ");
            sql.push_str(&body);
        }
        Statement { sql, params }
    }
}
