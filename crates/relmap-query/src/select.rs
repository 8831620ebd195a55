//! SELECT statement builder.

use crate::expr::{Dialect, Statement, Term, quote_ident, render_criteria};
use relmap_core::Value;

/// Builder for a parameterized SELECT.
///
/// Criteria accumulate with `AND`; order and limit are optional. The
/// mapper hands these out as query handles so callers can filter further
/// before a fetch runs.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    criteria: Vec<(String, Term)>,
    order_by: Vec<(String, bool)>,
    limit: Option<u64>,
}

impl SelectBuilder {
    /// Start a SELECT against the given table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            criteria: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// The table this select reads from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Select specific columns (default is `*`).
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Constrain a column to equal a scalar (or `IS NULL` for `Null`).
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.push((column.into(), Term::from(value.into())));
        self
    }

    /// Constrain a column to a set of values (`IN`).
    #[must_use]
    pub fn where_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.criteria.push((column.into(), Term::In(values)));
        self
    }

    /// Constrain a column to `IS NULL`.
    #[must_use]
    pub fn where_null(mut self, column: impl Into<String>) -> Self {
        self.criteria.push((column.into(), Term::IsNull));
        self
    }

    /// Append an ORDER BY column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order_by.push((column.into(), descending));
        self
    }

    /// Cap the number of returned rows.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build with the default dialect.
    pub fn build(&self) -> Statement {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the SELECT SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Statement {
        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut params = Vec::new();
        let mut sql = format!("SELECT {} FROM {}", projection, quote_ident(&self.table));

        if let Some(body) = render_criteria(&self.criteria, dialect, &mut params) {
            sql.push_str(" WHERE ");
            sql.push_str(&body);
        }

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(col, desc)| {
                    if *desc {
                        format!("{} DESC", quote_ident(col))
                    } else {
                        quote_ident(col)
                    }
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Statement { sql, params }
    }
}
