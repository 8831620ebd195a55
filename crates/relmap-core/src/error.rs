//! Error types for relmap operations.

use std::fmt;

/// The primary error type for all relmap operations.
#[derive(Debug)]
pub enum Error {
    /// Identity-map and row-immutability errors
    Identity(IdentityError),
    /// Field/schema configuration errors
    Field(FieldError),
    /// Relationship configuration and resolution errors
    Relation(RelationError),
    /// Write-conflict errors (unexpected affected-row counts)
    Write(WriteError),
    /// Transaction-plan and work-item errors
    Transaction(TransactionError),
    /// Query execution errors raised by a connection
    Query(QueryError),
    /// Connection provider errors
    Connection(ConnectionError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct IdentityError {
    pub kind: IdentityErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityErrorKind {
    /// The row's identity is already registered in the identity map
    RowAlreadyMapped,
    /// The row was never registered in the identity map
    RowNotMapped,
    /// A primary-key component was set a second time
    ImmutableFieldAlreadySet,
    /// The row was deleted and no longer accepts mutation
    ImmutableOnceDeleted,
}

#[derive(Debug)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// The named field is neither a column nor a related slot
    FieldDoesNotExist,
    /// A write needed a complete primary key but one component is unset
    PrimaryKeyValueMissing,
    /// A primary-key component was given a non-scalar value
    PrimaryKeyValueNotScalar,
    /// A composite-key table was addressed with a single scalar key
    CompositeKeyNotProvided,
}

#[derive(Debug)]
pub struct RelationError {
    pub kind: RelationErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationErrorKind {
    /// No relationship with the requested name is defined
    RelationDoesNotExist,
    /// A through-relationship was resolved before its join relationship
    ThroughRelationNotFetched,
    /// A discriminator value has no registered sub-definition
    NoSuchDiscriminantValue,
    /// A relationship targets an entity the locator does not know
    ForeignMapperMissing,
}

#[derive(Debug)]
pub struct WriteError {
    /// Table the write ran against
    pub table: String,
    /// Rows the write was expected to touch
    pub expected: u64,
    /// Rows the database reported as touched
    pub actual: u64,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// The plan already executed
    PriorTransaction,
    /// The work item already ran
    PriorWork,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Syntax error in SQL
    Syntax,
    /// Table or column not found
    NotFound,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub message: String,
}

impl Error {
    /// Shorthand for an identity error.
    pub fn identity(kind: IdentityErrorKind, message: impl Into<String>) -> Self {
        Error::Identity(IdentityError {
            kind,
            message: message.into(),
        })
    }

    /// Shorthand for a field error.
    pub fn field(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Error::Field(FieldError {
            kind,
            message: message.into(),
        })
    }

    /// Shorthand for a relationship error.
    pub fn relation(kind: RelationErrorKind, message: impl Into<String>) -> Self {
        Error::Relation(RelationError {
            kind,
            message: message.into(),
        })
    }

    /// Shorthand for a transaction error.
    pub fn transaction(kind: TransactionErrorKind, message: impl Into<String>) -> Self {
        Error::Transaction(TransactionError {
            kind,
            message: message.into(),
        })
    }

    /// Build an unexpected-rows-affected error.
    pub fn unexpected_rows(table: impl Into<String>, expected: u64, actual: u64) -> Self {
        Error::Write(WriteError {
            table: table.into(),
            expected,
            actual,
        })
    }

    /// Is this a constraint violation reported by the database?
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Query(QueryError {
                kind: QueryErrorKind::Constraint,
                ..
            })
        )
    }

    /// The SQL that caused this error, if available.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Identity(e) => write!(f, "Identity error: {}", e.message),
            Error::Field(e) => write!(f, "Field error: {}", e.message),
            Error::Relation(e) => write!(f, "Relationship error: {}", e.message),
            Error::Write(e) => write!(
                f,
                "Unexpected rows affected on '{}': expected {}, got {}",
                e.table, e.expected, e.actual
            ),
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Query(e) => {
                if let Some(sql) = &e.sql {
                    write!(f, "Query error: {} (sql: {})", e.message, sql)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<IdentityError> for Error {
    fn from(err: IdentityError) -> Self {
        Error::Identity(err)
    }
}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Self {
        Error::Field(err)
    }
}

impl From<RelationError> for Error {
    fn from(err: RelationError) -> Self {
        Error::Relation(err)
    }
}

impl From<WriteError> for Error {
    fn from(err: WriteError) -> Self {
        Error::Write(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

/// Result type alias for relmap operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_helper() {
        let err = Error::Query(QueryError {
            kind: QueryErrorKind::Constraint,
            sql: Some("INSERT INTO t VALUES ($1)".to_string()),
            message: "unique violation".to_string(),
        });

        assert!(err.is_constraint_violation());
        assert_eq!(err.sql(), Some("INSERT INTO t VALUES ($1)"));

        let other = Error::Custom("nope".to_string());
        assert!(!other.is_constraint_violation());
        assert_eq!(other.sql(), None);
    }

    #[test]
    fn display_includes_kind_context() {
        let err = Error::unexpected_rows("threads", 1, 0);
        let text = err.to_string();
        assert!(text.contains("threads"));
        assert!(text.contains("expected 1"));

        let err = Error::identity(IdentityErrorKind::RowAlreadyMapped, "row already mapped");
        assert!(err.to_string().contains("already mapped"));
    }

    #[test]
    fn from_impls_wrap_kinds() {
        let err: Error = TransactionError {
            kind: TransactionErrorKind::PriorWork,
            message: "work already invoked".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            Error::Transaction(TransactionError {
                kind: TransactionErrorKind::PriorWork,
                ..
            })
        ));
    }
}
