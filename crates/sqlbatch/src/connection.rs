//! The execution seam between compiled statements and a database driver.

use sqlbatch_core::{Row, SqlValue};

use crate::error::DriverError;

/// What a write statement did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Id generated by the statement, if it inserted a row.
    pub last_insert_id: Option<i64>,
}

/// A synchronous database connection.
///
/// Implementations prepare `sql`, bind `params` left to right to its `?`
/// placeholders and run it. Callers guarantee that no parameter is a
/// [`SqlValue::List`].
pub trait Connection: Send {
    /// Driver name used to pick the SQL dialect, e.g. `"sqlite"`.
    fn driver_name(&self) -> &str;

    /// Runs a statement that returns no rows.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, DriverError>;

    /// Runs a query and materializes every row.
    fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DriverError>;

    /// Id generated by the most recent successful insert.
    fn last_insert_id(&self) -> Option<i64>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn driver_name(&self) -> &str {
        (**self).driver_name()
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, DriverError> {
        (**self).execute(sql, params)
    }

    fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        (**self).fetch_all(sql, params)
    }

    fn last_insert_id(&self) -> Option<i64> {
        (**self).last_insert_id()
    }
}

pub(crate) fn list_bind_error() -> DriverError {
    DriverError::new("list values can't be bound to a single placeholder")
}

/// Only inserts report a generated id; other statements leave the
/// connection's last id untouched.
pub(crate) fn is_insert(sql: &str) -> bool {
    let head = sql.trim_start();
    ["INSERT", "REPLACE"].iter().any(|verb| {
        head.get(..verb.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(verb))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_insert() {
        assert!(is_insert("INSERT INTO t VALUES (1)"));
        assert!(is_insert("  insert or ignore into t"));
        assert!(is_insert("REPLACE INTO t (a) VALUES (?)"));
        assert!(!is_insert("UPDATE t SET a = 1"));
        assert!(!is_insert("INS"));
    }
}
