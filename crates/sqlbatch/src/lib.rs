//! # sqlbatch
//!
//! Synchronous table access for MySQL and SQLite built on the compilers in
//! [`sqlbatch_core`].
//!
//! This crate provides:
//! - [`Session`]: a connection paired with its detected dialect
//! - [`Model`]: a table handle for finds, aggregates and single-row writes
//! - batched inserts, `INSERT IGNORE` batches and upsert batches that split
//!   rows into statements under the bound-parameter ceiling
//! - [`ChangeObserver`] hooks reporting every row a model writes
//! - [`ConnectionConfig`] for building a session from a URL or JSON
//!
//! ## Quick Start
//!
//! ```rust
//! use sqlbatch::prelude::*;
//!
//! # fn main() -> sqlbatch::Result<()> {
//! let mut session = sqlbatch::connect(&ConnectionConfig::sqlite(":memory:"))?;
//!
//! let schema = TableSchema::builder("counters")
//!     .column(ColumnSpec::new("id", "int").auto_increment().primary_key())
//!     .column(ColumnSpec::new("foo", "varchar(255)").unique())
//!     .column(ColumnSpec::new("count", "int"))
//!     .build()?;
//! session.create_table(schema).execute()?;
//!
//! let counters = Model::new("counters");
//! let rows = vec![row! { "foo" => "bar", "count" => 1 }];
//! let policy = UpsertPolicy::new().increment(["count"]);
//! counters.insert_update_batch(&mut session, &rows, policy.clone())?;
//! counters.insert_update_batch(&mut session, &rows, policy)?;
//!
//! let count = counters
//!     .select()
//!     .columns(["count"])
//!     .where_eq("foo", "bar")
//!     .value(&mut session)?;
//! assert_eq!(count, Some(SqlValue::Int(2)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Every statement is logged through `tracing` at debug level with its
//! timing; batch summaries and DDL are logged at info. Install a subscriber
//! to see them.

pub mod config;
pub mod connection;
pub mod ddl;
pub mod error;
pub mod model;
pub mod mysql;
pub mod observer;
pub mod result;
pub mod select;
pub mod session;
pub mod sqlite;

pub use config::{connect, connect_with, ConnectionConfig};
pub use connection::{Connection, ExecOutcome};
pub use ddl::CreateTable;
pub use error::{normalize_sql, DriverError, DriverErrorKind, Error, Result};
pub use model::{Model, DEFAULT_PRIMARY_KEY};
pub use mysql::MySqlConnection;
pub use observer::{ChangeEvent, ChangeKind, ChangeObserver, FnObserver};
pub use result::QueryResult;
pub use select::SelectExt;
pub use session::{Session, SessionOptions};
pub use sqlite::SqliteConnection;

pub use sqlbatch_core::{
    row, BatchMode, ColumnSpec, Conditional, Dialect, Filter, Row, Select, SqlValue, TableSchema,
    ToSqlValue, UpsertPolicy, ValidationError,
};

/// Re-exports for typical use.
pub mod prelude {
    pub use crate::config::{connect, ConnectionConfig};
    pub use crate::error::{Error, Result};
    pub use crate::model::Model;
    pub use crate::observer::{ChangeEvent, ChangeKind, ChangeObserver};
    pub use crate::result::QueryResult;
    pub use crate::select::SelectExt;
    pub use crate::session::{Session, SessionOptions};
    pub use sqlbatch_core::prelude::*;
    pub use sqlbatch_core::ValidationError;
}
