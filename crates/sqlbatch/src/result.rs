//! Materialized query results.

use sqlbatch_core::{Row, SqlValue};

/// Rows returned by one executed query.
///
/// The shaping methods consume the result, so a query runs once no matter
/// how its rows are read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    rows: Vec<Row>,
}

impl QueryResult {
    /// Wraps fetched rows.
    #[must_use]
    pub const fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no rows matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrows the rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The first row, if any.
    #[must_use]
    pub fn first_row(self) -> Option<Row> {
        self.rows.into_iter().next()
    }

    /// The first column of the first row.
    #[must_use]
    pub fn value(self) -> Option<SqlValue> {
        self.first_row()
            .and_then(|row| row.into_parts().1.into_iter().next())
    }

    /// The first column of every row.
    #[must_use]
    pub fn column_values(self) -> Vec<SqlValue> {
        self.rows
            .into_iter()
            .filter_map(|row| row.into_parts().1.into_iter().next())
            .collect()
    }

    /// Every row.
    #[must_use]
    pub fn all_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for QueryResult {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
