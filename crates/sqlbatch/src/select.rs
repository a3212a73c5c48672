//! Running [`Select`] queries directly.

use sqlbatch_core::{Row, Select, SqlValue};

use crate::error::Result;
use crate::result::QueryResult;
use crate::session::Session;

/// Terminal operations for a [`Select`].
///
/// Each method compiles the query once, runs it once and shapes the rows.
pub trait SelectExt {
    /// Runs the query.
    fn fetch(&self, session: &mut Session) -> Result<QueryResult>;

    /// The first matching row.
    fn first_row(&self, session: &mut Session) -> Result<Option<Row>> {
        self.fetch(session).map(QueryResult::first_row)
    }

    /// The first column of the first matching row.
    fn value(&self, session: &mut Session) -> Result<Option<SqlValue>> {
        self.fetch(session).map(QueryResult::value)
    }

    /// The first column of every matching row.
    fn column_values(&self, session: &mut Session) -> Result<Vec<SqlValue>> {
        self.fetch(session).map(QueryResult::column_values)
    }

    /// Every matching row.
    fn all_rows(&self, session: &mut Session) -> Result<Vec<Row>> {
        self.fetch(session).map(QueryResult::all_rows)
    }
}

impl SelectExt for Select {
    fn fetch(&self, session: &mut Session) -> Result<QueryResult> {
        session.query(self)
    }
}
