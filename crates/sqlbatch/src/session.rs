//! A connection paired with its dialect.
//!
//! Every compiled statement goes through [`Session::execute`] or
//! [`Session::fetch_all`]: parameters are checked for composite values before
//! the driver sees them, each statement is logged with its timing, and driver
//! failures come back as [`Error::Driver`] carrying the normalized SQL.

use std::time::Instant;

use sqlbatch_core::{Dialect, Row, Select, SqlDialect, SqlValue, TableSchema, ValidationError};
use tracing::{debug, error, warn};

use crate::connection::{Connection, ExecOutcome};
use crate::ddl::CreateTable;
use crate::error::{normalize_sql, Error, Result};
use crate::result::QueryResult;

/// Tunables for a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Ceiling on bound parameters per batch statement. Clamped to the
    /// dialect's hard limit.
    pub max_params: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_params: sqlbatch_core::DEFAULT_MAX_PARAMS,
        }
    }
}

/// A database connection and the dialect detected from it.
pub struct Session {
    conn: Box<dyn Connection>,
    dialect: Dialect,
    max_params: usize,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("driver", &self.conn.driver_name())
            .field("dialect", &self.dialect)
            .field("max_params", &self.max_params)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wraps a connection with default options.
    pub fn new(conn: impl Connection + 'static) -> Result<Self> {
        Self::with_options(conn, SessionOptions::default())
    }

    /// Wraps a connection.
    pub fn with_options(conn: impl Connection + 'static, options: SessionOptions) -> Result<Self> {
        Self::from_boxed(Box::new(conn), options)
    }

    /// Wraps an already boxed connection.
    pub fn from_boxed(conn: Box<dyn Connection>, options: SessionOptions) -> Result<Self> {
        let dialect = Dialect::from_driver_name(conn.driver_name())?;
        if options.max_params == 0 {
            return Err(Error::Configuration(String::from(
                "max_params must be greater than zero",
            )));
        }
        let max_params = options.max_params.min(dialect.max_bind_params());
        if max_params < options.max_params {
            debug!(
                requested = options.max_params,
                limit = max_params,
                dialect = %dialect,
                "Clamped bound parameter ceiling"
            );
        }
        Ok(Self {
            conn,
            dialect,
            max_params,
        })
    }

    /// The dialect every statement is compiled for.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Effective ceiling on bound parameters per statement.
    #[must_use]
    pub const fn max_params(&self) -> usize {
        self.max_params
    }

    /// Id generated by the most recent successful insert.
    #[must_use]
    pub fn last_insert_id(&self) -> Option<i64> {
        self.conn.last_insert_id()
    }

    /// Runs a statement that returns no rows.
    pub fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome> {
        check_params(params)?;
        let start = Instant::now();
        match self.conn.execute(sql, params) {
            Ok(outcome) => {
                debug!(
                    sql = %sql,
                    params = params.len(),
                    rows_affected = outcome.rows_affected,
                    elapsed = ?start.elapsed(),
                    "Executed statement"
                );
                Ok(outcome)
            }
            Err(source) => Err(failed(sql, params, source)),
        }
    }

    /// Runs a query and materializes every row.
    pub fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        check_params(params)?;
        let start = Instant::now();
        match self.conn.fetch_all(sql, params) {
            Ok(rows) => {
                debug!(
                    sql = %sql,
                    params = params.len(),
                    rows = rows.len(),
                    elapsed = ?start.elapsed(),
                    "Fetched rows"
                );
                Ok(rows)
            }
            Err(source) => Err(failed(sql, params, source)),
        }
    }

    /// Compiles and runs a query.
    pub fn query(&mut self, select: &Select) -> Result<QueryResult> {
        let (sql, params) = select.build()?;
        self.fetch_all(&sql, &params).map(QueryResult::new)
    }

    /// Runs caller-supplied SQL.
    pub fn select_raw(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        self.fetch_all(sql, params).map(QueryResult::new)
    }

    /// Starts a `CREATE TABLE` bound to this session.
    pub fn create_table(&mut self, schema: TableSchema) -> CreateTable<'_> {
        CreateTable::new(self, schema)
    }

    /// Runs `f` inside a transaction.
    ///
    /// Commits when `f` succeeds and rolls back when it fails; the error
    /// from `f` is returned either way.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.execute("BEGIN", &[])?;
        match f(self) {
            Ok(value) => {
                self.execute("COMMIT", &[])?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.execute("ROLLBACK", &[]) {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn check_params(params: &[SqlValue]) -> std::result::Result<(), ValidationError> {
    match params.iter().position(|p| !p.is_scalar()) {
        Some(index) => Err(ValidationError::NonScalarParameter {
            index,
            value: params[index].to_string(),
        }),
        None => Ok(()),
    }
}

fn failed(sql: &str, params: &[SqlValue], source: crate::error::DriverError) -> Error {
    if source.is_unique_violation() {
        debug!(sql = %normalize_sql(sql), error = %source, "Duplicate key");
    } else {
        error!(sql = %normalize_sql(sql), error = %source, "Statement failed");
    }
    Error::driver(sql, params, source)
}
