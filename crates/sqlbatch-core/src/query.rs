//! SELECT statement compilation.
//!
//! ```rust
//! use sqlbatch_core::prelude::*;
//!
//! let (sql, params) = Select::table("test_table")
//!     .columns_raw("foo, SUM(height) AS total")
//!     .where_in("foo", ["a", "b"])
//!     .group_by(["foo"])
//!     .order_by("total DESC")
//!     .limit(5)
//!     .offset(10)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT foo, SUM(height) AS total FROM test_table WHERE foo IN (?, ?) \
//!      GROUP BY foo ORDER BY total DESC LIMIT 10, 5"
//! );
//! assert_eq!(params.len(), 2);
//! ```

use crate::error::{Result, ValidationError};
use crate::predicate::{Conditional, Filter};
use crate::value::SqlValue;

/// The projection of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Columns {
    /// `*`
    #[default]
    All,
    /// Column names joined by `, `.
    List(Vec<String>),
    /// Trusted fragment, emitted verbatim.
    Raw(String),
}

impl Columns {
    fn render(&self) -> String {
        match self {
            Self::All => String::from("*"),
            Self::List(columns) if columns.is_empty() => String::from("*"),
            Self::List(columns) => columns.join(", "),
            Self::Raw(sql) => sql.clone(),
        }
    }
}

/// A SELECT query over a single table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    table: String,
    columns: Columns,
    filter: Filter,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    collation: Option<String>,
}

impl Select {
    /// Starts a query over `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Selects the given columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Columns::List(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Selects a raw projection such as `COUNT(*)`.
    #[must_use]
    pub fn columns_raw(mut self, sql: impl Into<String>) -> Self {
        self.columns = Columns::Raw(sql.into());
        self
    }

    /// Adds GROUP BY columns.
    #[must_use]
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Adds an ORDER BY term, e.g. `"height DESC"`.
    #[must_use]
    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by.push(term.into());
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset. Ignored unless a limit is also set.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Appends a trailing `COLLATE` clause.
    #[must_use]
    pub fn collate(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Table being queried.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Builds the query and returns SQL with parameters.
    pub fn build(&self) -> Result<(String, Vec<SqlValue>)> {
        if self.table.trim().is_empty() {
            return Err(ValidationError::MissingTable);
        }
        let (condition, params) = self.filter.compile()?;

        let mut sql = format!("SELECT {} FROM {}", self.columns.render(), self.table);
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {offset}, {limit}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, _) => {}
        }
        if let Some(collation) = &self.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(collation);
        }
        Ok((sql, params))
    }
}

impl Conditional for Select {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }
}
