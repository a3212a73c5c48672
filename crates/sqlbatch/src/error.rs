//! Error types for statement execution.

use std::fmt;

use sqlbatch_core::{SqlValue, ValidationError};
use thiserror::Error;

/// Broad classification of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// A unique or primary key constraint rejected the statement.
    UniqueViolation,
    /// Anything else.
    Other,
}

/// A failure reported by the database driver.
#[derive(Debug, Error)]
pub struct DriverError {
    message: String,
    code: Option<String>,
    kind: DriverErrorKind,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    /// Creates an error with no underlying cause.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            kind: DriverErrorKind::Other,
            source: None,
        }
    }

    /// Wraps an arbitrary error.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            message: err.to_string(),
            code: None,
            kind: DriverErrorKind::Other,
            source: Some(Box::new(err)),
        }
    }

    /// Driver-specific error code (SQLSTATE or vendor code), if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Error classification.
    #[must_use]
    pub const fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    /// Returns `true` if a unique key rejected the statement.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.kind == DriverErrorKind::UniqueViolation
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        let (code, kind) = match &err {
            sqlx::Error::Database(db) => (
                db.code().map(|c| c.into_owned()),
                if db.is_unique_violation() {
                    DriverErrorKind::UniqueViolation
                } else {
                    DriverErrorKind::Other
                },
            ),
            _ => (None, DriverErrorKind::Other),
        };
        Self {
            message: err.to_string(),
            code,
            kind,
            source: Some(Box::new(err)),
        }
    }
}

/// Errors returned by sessions and models.
#[derive(Debug, Error)]
pub enum Error {
    /// The statement could not be compiled.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A required collaborator is missing or misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Opening the connection failed.
    #[error("connection failed: {0}")]
    Connect(#[source] DriverError),

    /// The database rejected a statement.
    #[error("{source}; sql: {sql}; params: {params}")]
    Driver {
        /// Whitespace-normalized SQL text.
        sql: String,
        /// JSON rendering of the bound parameters.
        params: String,
        /// The driver failure.
        source: DriverError,
    },
}

impl Error {
    pub(crate) fn driver(sql: &str, params: &[SqlValue], source: DriverError) -> Self {
        Self::Driver {
            sql: normalize_sql(sql),
            params: serde_json::to_string(params).unwrap_or_else(|_| String::from("[]")),
            source,
        }
    }

    /// Returns `true` if a unique key rejected the statement.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::Driver { source, .. } if source.is_unique_violation())
    }
}

/// Collapses runs of whitespace so multi-line SQL logs on one line.
#[must_use]
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Result type alias for execution.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sql() {
        assert_eq!(
            normalize_sql("SELECT *\n   FROM  t\n\tWHERE id = ?"),
            "SELECT * FROM t WHERE id = ?"
        );
    }

    #[test]
    fn test_driver_error_display() {
        let err = Error::driver(
            "INSERT INTO t\n (a) VALUES (?)",
            &[SqlValue::Text("x".into())],
            DriverError::new("boom"),
        );
        assert_eq!(
            err.to_string(),
            r#"boom; sql: INSERT INTO t (a) VALUES (?); params: ["x"]"#
        );
        assert!(!err.is_duplicate_key());
    }

    #[test]
    fn test_validation_is_transparent() {
        let err: Error = ValidationError::MissingTable.into();
        assert_eq!(err.to_string(), "database table name can't be empty");
    }
}
