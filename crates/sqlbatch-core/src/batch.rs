//! Batched multi-row inserts.
//!
//! Databases cap the number of bound parameters a single prepared statement
//! may carry. [`BatchPlan`] splits `n` rows of `k` columns into contiguous
//! ranges of `floor(max_params / k)` rows, and [`BatchInsert`] compiles one
//! `INSERT ... VALUES (...), (...)` statement per range, optionally with an
//! `IGNORE` modifier or a dialect-specific upsert clause.

use std::collections::HashSet;
use std::ops::Range;

use crate::dialect::{Dialect, SqlDialect};
use crate::error::{Result, ValidationError};
use crate::value::{Row, SqlValue};

/// Default ceiling on bound parameters per statement.
pub const DEFAULT_MAX_PARAMS: usize = 60_000;

/// How a batch of rows is split into statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total_rows: usize,
    columns: usize,
    rows_per_chunk: usize,
}

impl BatchPlan {
    /// Plans `total_rows` rows of `columns` values under `max_params`.
    pub fn new(total_rows: usize, columns: usize, max_params: usize) -> Result<Self> {
        if total_rows == 0 {
            return Err(ValidationError::EmptyData("batch"));
        }
        if columns == 0 {
            return Err(ValidationError::EmptyData("row"));
        }
        let rows_per_chunk = max_params / columns;
        if rows_per_chunk == 0 {
            return Err(ValidationError::RowTooWide {
                columns,
                max_params,
            });
        }
        Ok(Self {
            total_rows,
            columns,
            rows_per_chunk,
        })
    }

    /// Rows carried by every chunk but possibly the last.
    #[must_use]
    pub const fn rows_per_chunk(&self) -> usize {
        self.rows_per_chunk
    }

    /// Number of statements the batch compiles to.
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.total_rows.div_ceil(self.rows_per_chunk)
    }

    /// Total number of rows.
    #[must_use]
    pub const fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Columns per row.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Row ranges, in input order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> {
        let total = self.total_rows;
        let step = self.rows_per_chunk;
        (0..total)
            .step_by(step)
            .map(move |start| start..(start + step).min(total))
    }
}

/// Columns to overwrite or accumulate when an inserted row conflicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertPolicy {
    update: Vec<String>,
    increment: Vec<String>,
}

impl UpsertPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns set to the inserted value on conflict.
    #[must_use]
    pub fn update<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Columns incremented by the inserted value on conflict.
    #[must_use]
    pub fn increment<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.increment.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Update-from-insert columns.
    #[must_use]
    pub fn update_columns(&self) -> &[String] {
        &self.update
    }

    /// Increment-by-insert columns.
    #[must_use]
    pub fn increment_columns(&self) -> &[String] {
        &self.increment
    }

    /// Checks the policy against the inserted column layout.
    pub fn validate(&self, inserted: &[String]) -> Result<()> {
        if self.update.is_empty() && self.increment.is_empty() {
            return Err(ValidationError::EmptyUpsertPolicy);
        }
        let updated: HashSet<&str> = self.update.iter().map(String::as_str).collect();
        if let Some(column) = self.increment.iter().find(|c| updated.contains(c.as_str())) {
            return Err(ValidationError::ConflictingUpsertColumn(column.clone()));
        }
        if let Some(column) = self
            .update
            .iter()
            .chain(&self.increment)
            .find(|c| !inserted.contains(c))
        {
            return Err(ValidationError::UnknownUpsertColumn(column.clone()));
        }
        Ok(())
    }
}

/// What to do with rows that hit a unique key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Plain insert; conflicts fail the statement.
    #[default]
    Insert,
    /// Conflicting rows are skipped.
    InsertIgnore,
    /// Conflicting rows are merged according to the policy.
    Upsert(UpsertPolicy),
}

/// One compiled statement of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchChunk {
    /// SQL text.
    pub sql: String,
    /// Bound values, row-major.
    pub params: Vec<SqlValue>,
    /// Input rows this chunk carries.
    pub rows: Range<usize>,
}

/// A multi-row insert over a borrowed slice of rows.
#[derive(Debug, Clone)]
pub struct BatchInsert<'a> {
    table: String,
    rows: &'a [Row],
    mode: BatchMode,
    conflict_columns: Vec<String>,
}

impl<'a> BatchInsert<'a> {
    /// Creates a plain batch insert into `table`.
    #[must_use]
    pub fn new(table: impl Into<String>, rows: &'a [Row]) -> Self {
        Self {
            table: table.into(),
            rows,
            mode: BatchMode::Insert,
            conflict_columns: Vec::new(),
        }
    }

    /// Sets the conflict handling mode.
    #[must_use]
    pub fn mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Skips conflicting rows.
    #[must_use]
    pub fn ignore(self) -> Self {
        self.mode(BatchMode::InsertIgnore)
    }

    /// Merges conflicting rows according to `policy`.
    #[must_use]
    pub fn upsert(self, policy: UpsertPolicy) -> Self {
        self.mode(BatchMode::Upsert(policy))
    }

    /// Sets the conflict target for dialects that need one.
    #[must_use]
    pub fn conflict_columns(mut self, columns: Vec<String>) -> Self {
        self.conflict_columns = columns;
        self
    }

    /// Validates the rows and returns the shared column layout.
    pub fn columns(&self) -> Result<&'a [String]> {
        if self.table.trim().is_empty() {
            return Err(ValidationError::MissingTable);
        }
        let Some(first) = self.rows.first() else {
            return Err(ValidationError::EmptyData("batch"));
        };
        if first.is_empty() {
            return Err(ValidationError::NoColumns(self.table.clone()));
        }
        let expected = first.columns();
        if let Some((index, row)) = self
            .rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row.columns() != expected)
        {
            return Err(ValidationError::RowShapeMismatch {
                index,
                expected: expected.to_vec(),
                found: row.columns().to_vec(),
            });
        }
        if let BatchMode::Upsert(policy) = &self.mode {
            policy.validate(expected)?;
        }
        Ok(expected)
    }

    /// Validates the batch and plans its chunks.
    pub fn plan(&self, max_params: usize) -> Result<BatchPlan> {
        let columns = self.columns()?;
        BatchPlan::new(self.rows.len(), columns.len(), max_params)
    }

    /// Validates the batch and returns its statements, one per chunk.
    ///
    /// Chunks are compiled lazily as the iterator advances.
    pub fn compile(&self, dialect: Dialect, max_params: usize) -> Result<BatchChunks<'a>> {
        let columns = self.columns()?;
        let plan = BatchPlan::new(self.rows.len(), columns.len(), max_params)?;

        let verb = match self.mode {
            BatchMode::InsertIgnore => dialect.insert_ignore(),
            _ => "INSERT",
        };
        let quoted: Vec<String> = columns.iter().map(|c| dialect.quote_identifier(c)).collect();
        let prefix = format!(
            "{verb} INTO {} ({}) VALUES ",
            dialect.quote_identifier(&self.table),
            quoted.join(", ")
        );
        let suffix = match &self.mode {
            BatchMode::Upsert(policy) => {
                format!(" {}", dialect.render_upsert(&self.conflict_columns, policy))
            }
            _ => String::new(),
        };
        let group = format!(
            "({})",
            vec![SqlValue::placeholder(); columns.len()].join(", ")
        );

        Ok(BatchChunks {
            rows: self.rows,
            prefix,
            suffix,
            group,
            plan,
            next: 0,
        })
    }
}

/// Iterator over the compiled statements of a [`BatchInsert`].
#[derive(Debug, Clone)]
pub struct BatchChunks<'a> {
    rows: &'a [Row],
    prefix: String,
    suffix: String,
    group: String,
    plan: BatchPlan,
    next: usize,
}

impl BatchChunks<'_> {
    /// The plan these chunks follow.
    #[must_use]
    pub const fn plan(&self) -> &BatchPlan {
        &self.plan
    }
}

impl Iterator for BatchChunks<'_> {
    type Item = BatchChunk;

    fn next(&mut self) -> Option<BatchChunk> {
        let start = self.next;
        if start >= self.rows.len() {
            return None;
        }
        let end = (start + self.plan.rows_per_chunk()).min(self.rows.len());
        self.next = end;

        let chunk = &self.rows[start..end];
        let groups = vec![self.group.as_str(); chunk.len()].join(", ");
        let sql = format!("{}{groups}{}", self.prefix, self.suffix);
        let params = chunk
            .iter()
            .flat_map(|row| row.values().iter().cloned())
            .collect();

        Some(BatchChunk {
            sql,
            params,
            rows: start..end,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.rows.len() - self.next).div_ceil(self.plan.rows_per_chunk());
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchChunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    fn rows(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| row! { "foo" => format!("foo{i}"), "count" => i })
            .collect()
    }

    #[test]
    fn test_plan_exact_division() {
        let plan = BatchPlan::new(10, 3, 9).unwrap();
        assert_eq!(plan.rows_per_chunk(), 3);
        assert_eq!(plan.chunk_count(), 4);
        assert_eq!(
            plan.ranges().collect::<Vec<_>>(),
            vec![0..3, 3..6, 6..9, 9..10]
        );
    }

    #[test]
    fn test_plan_row_too_wide() {
        assert_eq!(
            BatchPlan::new(1, 5, 4),
            Err(ValidationError::RowTooWide {
                columns: 5,
                max_params: 4,
            })
        );
    }

    #[test]
    fn test_plain_batch_sql() {
        let rows = rows(3);
        let chunks: Vec<_> = BatchInsert::new("t", &rows)
            .compile(Dialect::Sqlite, DEFAULT_MAX_PARAMS)
            .unwrap()
            .collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].sql,
            "INSERT INTO \"t\" (\"foo\", \"count\") VALUES (?, ?), (?, ?), (?, ?)"
        );
        assert_eq!(chunks[0].params.len(), 6);
        assert_eq!(chunks[0].params[2], SqlValue::Text("foo1".into()));
        assert_eq!(chunks[0].rows, 0..3);
    }

    #[test]
    fn test_ignore_per_dialect() {
        let rows = rows(1);
        let sqlite = BatchInsert::new("t", &rows)
            .ignore()
            .compile(Dialect::Sqlite, DEFAULT_MAX_PARAMS)
            .unwrap()
            .next()
            .unwrap();
        assert!(sqlite.sql.starts_with("INSERT OR IGNORE INTO \"t\""));

        let mysql = BatchInsert::new("t", &rows)
            .ignore()
            .compile(Dialect::MySql, DEFAULT_MAX_PARAMS)
            .unwrap()
            .next()
            .unwrap();
        assert!(mysql.sql.starts_with("INSERT IGNORE INTO `t`"));
    }

    #[test]
    fn test_upsert_sql_mysql() {
        let rows = rows(2);
        let chunk = BatchInsert::new("t", &rows)
            .upsert(UpsertPolicy::new().increment(["count"]))
            .compile(Dialect::MySql, DEFAULT_MAX_PARAMS)
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(
            chunk.sql,
            "INSERT INTO `t` (`foo`, `count`) VALUES (?, ?), (?, ?) \
             ON DUPLICATE KEY UPDATE `count` = `count` + VALUES(`count`)"
        );
    }

    #[test]
    fn test_upsert_sql_sqlite() {
        let rows = rows(1);
        let chunk = BatchInsert::new("t", &rows)
            .upsert(UpsertPolicy::new().update(["count"]))
            .conflict_columns(vec!["foo".into()])
            .compile(Dialect::Sqlite, DEFAULT_MAX_PARAMS)
            .unwrap()
            .next()
            .unwrap();
        assert_eq!(
            chunk.sql,
            "INSERT INTO \"t\" (\"foo\", \"count\") VALUES (?, ?) \
             ON CONFLICT(\"foo\") DO UPDATE SET \"count\" = excluded.\"count\""
        );
    }

    #[test]
    fn test_rejects_empty_batch() {
        assert_eq!(
            BatchInsert::new("t", &[]).columns(),
            Err(ValidationError::EmptyData("batch"))
        );
    }

    #[test]
    fn test_rejects_mismatched_rows() {
        let rows = vec![
            row! { "a" => 1, "b" => 2 },
            row! { "a" => 1, "b" => 2 },
            row! { "b" => 2, "a" => 1 },
        ];
        assert_eq!(
            BatchInsert::new("t", &rows).columns(),
            Err(ValidationError::RowShapeMismatch {
                index: 2,
                expected: vec!["a".into(), "b".into()],
                found: vec!["b".into(), "a".into()],
            })
        );
    }

    #[test]
    fn test_rejects_bad_policies() {
        let rows = rows(1);
        let compile = |policy: UpsertPolicy| {
            BatchInsert::new("t", &rows)
                .upsert(policy)
                .compile(Dialect::MySql, DEFAULT_MAX_PARAMS)
                .map(|_| ())
        };
        assert_eq!(
            compile(UpsertPolicy::new()),
            Err(ValidationError::EmptyUpsertPolicy)
        );
        assert_eq!(
            compile(UpsertPolicy::new().update(["count"]).increment(["count"])),
            Err(ValidationError::ConflictingUpsertColumn("count".into()))
        );
        assert_eq!(
            compile(UpsertPolicy::new().update(["missing"])),
            Err(ValidationError::UnknownUpsertColumn("missing".into()))
        );
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let rows = rows(5);
        let mut chunks = BatchInsert::new("t", &rows)
            .compile(Dialect::Sqlite, 4)
            .unwrap();
        assert_eq!(chunks.len(), 3);
        chunks.next();
        assert_eq!(chunks.len(), 2);
    }
}
