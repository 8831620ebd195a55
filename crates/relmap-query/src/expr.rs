//! Criteria terms, placeholder dialects, and identifier quoting.

use relmap_core::Value;

/// SQL placeholder dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `$1`, `$2`, ... numbered placeholders
    #[default]
    Postgres,
    /// `?` positional placeholders
    Sqlite,
}

impl Dialect {
    /// The placeholder for the 1-based parameter position.
    #[must_use]
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${position}"),
            Dialect::Sqlite => "?".to_string(),
        }
    }
}

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One criteria term: how a column constrains a statement.
///
/// Scalars compile to equality, lists to `IN`, and null to `IS NULL`:
/// the full criteria contract the mapper layers rely on.
#[derive(Debug, Clone)]
pub enum Term {
    /// `column = value`
    Eq(Value),
    /// `column IN (values...)`
    In(Vec<Value>),
    /// `column IS NULL`
    IsNull,
}

impl Term {
    /// Render this term against a column, appending bound parameters.
    ///
    /// An empty `In` list renders a never-true predicate rather than
    /// invalid SQL, so a batch fetch with no keys stays executable.
    pub fn render(&self, column: &str, dialect: Dialect, params: &mut Vec<Value>) -> String {
        match self {
            Term::Eq(value) => {
                params.push(value.clone());
                format!(
                    "{} = {}",
                    quote_ident(column),
                    dialect.placeholder(params.len())
                )
            }
            Term::In(values) => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        dialect.placeholder(params.len())
                    })
                    .collect();
                format!("{} IN ({})", quote_ident(column), placeholders.join(", "))
            }
            Term::IsNull => format!("{} IS NULL", quote_ident(column)),
        }
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        if value.is_null() {
            Term::IsNull
        } else {
            Term::Eq(value)
        }
    }
}

impl From<Vec<Value>> for Term {
    fn from(values: Vec<Value>) -> Self {
        Term::In(values)
    }
}

/// A parameterized SQL statement ready for a connection.
#[derive(Debug, Clone)]
pub struct Statement {
    /// The SQL text with placeholders
    pub sql: String,
    /// Bound parameter values, in placeholder order
    pub params: Vec<Value>,
}

/// Render a criteria list as a `WHERE` body joined with `AND`.
///
/// Returns `None` when the criteria list is empty.
pub(crate) fn render_criteria(
    criteria: &[(String, Term)],
    dialect: Dialect,
    params: &mut Vec<Value>,
) -> Option<String> {
    if criteria.is_empty() {
        return None;
    }
    let clauses: Vec<String> = criteria
        .iter()
        .map(|(column, term)| term.render(column, dialect, params))
        .collect();
    Some(clauses.join(" AND "))
}
