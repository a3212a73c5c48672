//! # sqlbatch-core
//!
//! Dialect-aware SQL compilers. Nothing in this crate talks to a database:
//! every builder turns structured input into `(sql, params)` and fails with a
//! [`ValidationError`] before any SQL is produced when the input cannot be
//! compiled.
//!
//! This crate provides:
//! - [`TableSchema`] for `CREATE TABLE` with per-dialect auto-increment and
//!   table options
//! - [`Filter`] for WHERE clauses over a fixed operator allow-list
//! - [`Select`] for single-table queries
//! - [`Insert`], [`Update`] and [`Delete`] for single statements
//! - [`BatchInsert`] for multi-row inserts and upserts split to stay under a
//!   bound-parameter ceiling
//!
//! ## Batches
//!
//! ```rust
//! use sqlbatch_core::prelude::*;
//!
//! let rows: Vec<Row> = (0..5)
//!     .map(|i| row! { "foo" => format!("foo{i}"), "count" => 1 })
//!     .collect();
//!
//! let chunks: Vec<_> = BatchInsert::new("counters", &rows)
//!     .upsert(UpsertPolicy::new().increment(["count"]))
//!     .compile(Dialect::MySql, 4)
//!     .unwrap()
//!     .collect();
//!
//! // Two columns per row, four parameters per statement: two rows a chunk.
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(
//!     chunks[0].sql,
//!     "INSERT INTO `counters` (`foo`, `count`) VALUES (?, ?), (?, ?) \
//!      ON DUPLICATE KEY UPDATE `count` = `count` + VALUES(`count`)"
//! );
//! ```

pub mod batch;
pub mod dialect;
pub mod error;
pub mod predicate;
pub mod query;
pub mod schema;
pub mod value;
pub mod write;

pub use batch::{BatchChunk, BatchInsert, BatchMode, BatchPlan, UpsertPolicy, DEFAULT_MAX_PARAMS};
pub use dialect::{Dialect, SqlDialect};
pub use error::{Result, ValidationError};
pub use predicate::{Conditional, Filter, Operator, Predicate};
pub use query::{Columns, Select};
pub use schema::{ColumnSpec, TableSchema, TableSchemaBuilder};
pub use value::{Row, SqlValue, ToSqlValue};
pub use write::{Delete, Insert, InsertVerb, Update};

/// Everything needed to build statements, including the [`Conditional`]
/// trait that provides the `where_*` methods.
pub mod prelude {
    pub use crate::batch::{BatchInsert, BatchMode, UpsertPolicy};
    pub use crate::dialect::{Dialect, SqlDialect};
    pub use crate::predicate::{Conditional, Filter};
    pub use crate::query::Select;
    pub use crate::row;
    pub use crate::schema::{ColumnSpec, TableSchema};
    pub use crate::value::{Row, SqlValue, ToSqlValue};
    pub use crate::write::{Delete, Insert, Update};
}
