use crate::query::QueryErr;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("parse error: {0}")]
    Parse(#[from] QueryErr),

    #[error("no database selected")]
    NoDatabaseSelected,
    #[error("database '{0}' does not exist")]
    DatabaseNotFound(String),
    #[error("table '{0}' does not exist")]
    TableNotFound(String),
    #[error("table '{0}' already exists")]
    TableExists(String),
    #[error("column '{0}' does not exist")]
    ColumnNotFound(String),
    #[error("column '{0}' is declared more than once")]
    DuplicateColumn(String),
    #[error("column '{0}' is ambiguous")]
    AmbiguousColumn(String),
    #[error("alias '{0}' is used for more than one table")]
    AmbiguousAlias(String),
    #[error("unknown table or alias '{0}'")]
    UnknownAlias(String),
    #[error("expected {expected} values, got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("column '{0}' must appear in GROUP BY or be used in an aggregate")]
    NotGrouped(String),
    #[error("{0} is not supported")]
    Unsupported(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("value '{value}' is not a valid {data_type} for column '{column}'")]
    TypeMismatch {
        column: String,
        data_type: String,
        value: String,
    },
    #[error("column '{0}' cannot be null")]
    NullViolation(String),

    #[error("invalid condition: {0}")]
    Condition(String),

    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt table file '{}': {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<DbError>,
    },
}

impl DbError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DbError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps the error with a prefix, e.g. "query execution failed".
    pub fn context(self, context: impl Into<String>) -> Self {
        DbError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any context wrapping.
    pub fn root(&self) -> &DbError {
        match self {
            DbError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_context_message() {
        let err = DbError::TableNotFound("users".to_string()).context("query execution failed");
        assert_eq!(
            err.to_string(),
            "query execution failed: table 'users' does not exist"
        );
        assert!(matches!(err.root(), DbError::TableNotFound(_)));
    }

    #[test]
    fn test_parse_conversion() {
        let err: DbError = QueryErr::MissingClause("FROM clause").into();
        assert_eq!(err.to_string(), "parse error: missing FROM clause");
    }
}
