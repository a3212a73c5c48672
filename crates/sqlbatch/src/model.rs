//! Table handles.
//!
//! A [`Model`] names a table and its primary key and bundles the everyday
//! reads and writes against it. It holds no connection: every operation takes
//! the [`Session`] to run on, so one model can serve many sessions.
//!
//! ```no_run
//! use sqlbatch::prelude::*;
//!
//! # fn main() -> sqlbatch::Result<()> {
//! let mut session = sqlbatch::connect(&ConnectionConfig::sqlite("app.db"))?;
//! let counters = Model::new("counters");
//!
//! let rows = vec![row! { "foo" => "bar", "count" => 1 }];
//! counters.insert_update_batch(&mut session, &rows, UpsertPolicy::new().increment(["count"]))?;
//!
//! let count = counters
//!     .select()
//!     .columns(["count"])
//!     .where_eq("foo", "bar")
//!     .value(&mut session)?;
//! # let _ = count;
//! # Ok(())
//! # }
//! ```

use sqlbatch_core::{
    BatchInsert, Conditional, Delete, Filter, Insert, Row, Select, SqlDialect, SqlValue,
    ToSqlValue, Update, UpsertPolicy,
};
use tracing::{debug, info};

use crate::error::Result;
use crate::observer::{self, ChangeEvent, ChangeKind, ChangeObserver};
use crate::result::QueryResult;
use crate::select::SelectExt;
use crate::session::Session;

/// Primary key column used unless configured otherwise.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// A table and its primary key.
pub struct Model {
    table: String,
    primary_key: String,
    observer: Option<Box<dyn ChangeObserver>>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl Model {
    /// A handle for `table` keyed by `id`.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: String::from(DEFAULT_PRIMARY_KEY),
            observer: None,
        }
    }

    /// Uses a different primary key column.
    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Reports every change to `observer`.
    #[must_use]
    pub fn observe(mut self, observer: impl ChangeObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Reports every change to a closure.
    #[must_use]
    pub fn on_change<F>(self, f: F) -> Self
    where
        F: FnMut(&ChangeEvent) + Send + 'static,
    {
        self.observe(observer::from_fn(f))
    }

    /// Table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key column.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn check(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(sqlbatch_core::ValidationError::MissingTable.into());
        }
        if self.primary_key.trim().is_empty() {
            return Err(sqlbatch_core::ValidationError::MissingPrimaryKey.into());
        }
        Ok(())
    }

    // Reads

    /// A fresh query over this table.
    #[must_use]
    pub fn select(&self) -> Select {
        Select::table(&self.table)
    }

    /// Runs caller-supplied SQL.
    pub fn select_raw(
        &self,
        session: &mut Session,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult> {
        session.select_raw(sql, params)
    }

    /// The row whose primary key is `id`.
    pub fn find(&self, session: &mut Session, id: impl ToSqlValue) -> Result<Option<Row>> {
        self.check()?;
        self.select()
            .where_eq(&self.primary_key, id)
            .limit(1)
            .first_row(session)
    }

    /// Number of rows matching `filter`.
    pub fn count(&self, session: &mut Session, filter: Filter) -> Result<i64> {
        let value = self
            .select()
            .columns_raw("COUNT(*)")
            .filter(filter)
            .value(session)?;
        Ok(value.as_ref().and_then(SqlValue::as_i64).unwrap_or(0))
    }

    /// Largest value of `column` among rows matching `filter`.
    pub fn max(
        &self,
        session: &mut Session,
        column: &str,
        filter: Filter,
    ) -> Result<Option<SqlValue>> {
        self.aggregate(session, "MAX", column, filter)
    }

    /// Smallest value of `column` among rows matching `filter`.
    pub fn min(
        &self,
        session: &mut Session,
        column: &str,
        filter: Filter,
    ) -> Result<Option<SqlValue>> {
        self.aggregate(session, "MIN", column, filter)
    }

    /// Sum of `column` over the whole table.
    pub fn sum(&self, session: &mut Session, column: &str) -> Result<Option<SqlValue>> {
        self.aggregate(session, "SUM", column, Filter::new())
    }

    fn aggregate(
        &self,
        session: &mut Session,
        function: &str,
        column: &str,
        filter: Filter,
    ) -> Result<Option<SqlValue>> {
        let value = self
            .select()
            .columns_raw(format!("{function}({column})"))
            .filter(filter)
            .value(session)?;
        Ok(value.filter(|v| !v.is_null()))
    }

    // Single-row writes

    /// Inserts one row and returns its generated id.
    ///
    /// With `ignore`, a row rejected by a unique key is skipped and `None`
    /// is returned.
    pub fn insert(
        &mut self,
        session: &mut Session,
        row: Row,
        ignore: bool,
    ) -> Result<Option<i64>> {
        let insert = Insert::new(&self.table, row);
        let insert = if ignore { insert.ignore() } else { insert };
        self.insert_one(session, &insert, ChangeKind::Insert)
    }

    /// Inserts one row, replacing any row it conflicts with.
    pub fn replace(&mut self, session: &mut Session, row: Row) -> Result<Option<i64>> {
        let insert = Insert::new(&self.table, row).replace();
        self.insert_one(session, &insert, ChangeKind::Replace)
    }

    fn insert_one(
        &mut self,
        session: &mut Session,
        insert: &Insert,
        kind: ChangeKind,
    ) -> Result<Option<i64>> {
        self.check()?;
        let (sql, params) = insert.build(session.dialect())?;
        let outcome = session.execute(&sql, &params)?;
        if outcome.rows_affected == 0 {
            return Ok(None);
        }
        let id = outcome.last_insert_id.or_else(|| session.last_insert_id());
        if let Some(id) = id {
            if self.observer.is_some() {
                if let Some(row) = self.find(session, id)? {
                    self.notify(kind, SqlValue::Int(id), row);
                }
            }
        }
        Ok(id)
    }

    /// Inserts `insert`, or applies `update` to the row it conflicts with.
    ///
    /// Returns the driver's affected-row count.
    pub fn insert_update(&self, session: &mut Session, insert: Row, update: Row) -> Result<u64> {
        self.check()?;
        let conflict = self.conflict_columns(session)?;
        let (sql, params) = Insert::new(&self.table, insert)
            .on_conflict_update(conflict, update)
            .build(session.dialect())?;
        Ok(session.execute(&sql, &params)?.rows_affected)
    }

    /// Sets the columns of `row` on the row whose primary key is `id`.
    pub fn update(&mut self, session: &mut Session, id: impl ToSqlValue, row: Row) -> Result<u64> {
        let filter = Filter::new().where_eq(&self.primary_key, id);
        self.update_where(session, filter, row)
    }

    /// Sets the columns of `row` on every row matching `filter`.
    ///
    /// An empty filter matches nothing: no statement runs and `0` is returned.
    pub fn update_where(&mut self, session: &mut Session, filter: Filter, row: Row) -> Result<u64> {
        self.check()?;
        if filter.is_empty() {
            debug!(table = %self.table, "Skipping update without conditions");
            return Ok(0);
        }
        let update = Update::table(&self.table).set_row(row).filter(filter.clone());
        self.write_observed(session, &filter, ChangeKind::Update, |dialect| {
            update.build(dialect)
        })
    }

    /// Adds `amount` to `column` on the row whose primary key is `id`.
    pub fn increment(
        &mut self,
        session: &mut Session,
        id: impl ToSqlValue,
        column: &str,
        amount: i64,
    ) -> Result<u64> {
        self.check()?;
        let filter = Filter::new().where_eq(&self.primary_key, id);
        let update = Update::table(&self.table)
            .increment(column, amount)
            .filter(filter.clone());
        self.write_observed(session, &filter, ChangeKind::Increment, |dialect| {
            update.build(dialect)
        })
    }

    /// Deletes the row whose primary key is `id`.
    pub fn delete(&mut self, session: &mut Session, id: impl ToSqlValue) -> Result<u64> {
        let filter = Filter::new().where_eq(&self.primary_key, id);
        self.delete_where(session, filter)
    }

    /// Deletes every row matching `filter`.
    ///
    /// An empty filter matches nothing: no statement runs and `0` is returned.
    pub fn delete_where(&mut self, session: &mut Session, filter: Filter) -> Result<u64> {
        self.check()?;
        if filter.is_empty() {
            debug!(table = %self.table, "Skipping delete without conditions");
            return Ok(0);
        }
        let delete = Delete::from_table(&self.table).filter(filter.clone());
        self.write_observed(session, &filter, ChangeKind::Delete, |dialect| {
            delete.build(dialect)
        })
    }

    // Pre-images are read only when someone is listening.
    fn write_observed<F>(
        &mut self,
        session: &mut Session,
        filter: &Filter,
        kind: ChangeKind,
        build: F,
    ) -> Result<u64>
    where
        F: FnOnce(sqlbatch_core::Dialect) -> sqlbatch_core::Result<(String, Vec<SqlValue>)>,
    {
        let (sql, params) = build(session.dialect())?;
        let before = if self.observer.is_some() {
            self.select().filter(filter.clone()).all_rows(session)?
        } else {
            Vec::new()
        };

        let affected = session.execute(&sql, &params)?.rows_affected;
        if affected > 0 {
            for row in before {
                let id = row.get(&self.primary_key).cloned().unwrap_or(SqlValue::Null);
                self.notify(kind, id, row);
            }
        }
        Ok(affected)
    }

    fn notify(&mut self, kind: ChangeKind, id: SqlValue, row: Row) {
        if let Some(observer) = self.observer.as_mut() {
            let event = ChangeEvent {
                table: self.table.clone(),
                kind,
                id,
                row,
            };
            observer.on_change(&event);
        }
    }

    // Batches

    /// Inserts `rows` in as few statements as the parameter ceiling allows.
    ///
    /// With `ignore`, rows rejected by a unique key are skipped. Chunks run
    /// one after another without a surrounding transaction; wrap the call in
    /// [`Session::transaction`] for all-or-nothing behavior.
    pub fn insert_batch(&self, session: &mut Session, rows: &[Row], ignore: bool) -> Result<u64> {
        let batch = BatchInsert::new(&self.table, rows);
        let batch = if ignore { batch.ignore() } else { batch };
        self.run_batch(session, &batch)
    }

    /// Inserts `rows`, merging rows that conflict on a unique key according
    /// to `policy`.
    pub fn insert_update_batch(
        &self,
        session: &mut Session,
        rows: &[Row],
        policy: UpsertPolicy,
    ) -> Result<u64> {
        // Validate before the conflict-target lookup touches the database.
        BatchInsert::new(&self.table, rows)
            .upsert(policy.clone())
            .columns()?;
        let conflict = self.conflict_columns(session)?;
        let batch = BatchInsert::new(&self.table, rows)
            .upsert(policy)
            .conflict_columns(conflict);
        self.run_batch(session, &batch)
    }

    fn run_batch(&self, session: &mut Session, batch: &BatchInsert<'_>) -> Result<u64> {
        self.check()?;
        let chunks = batch.compile(session.dialect(), session.max_params())?;
        let plan = *chunks.plan();

        let mut affected = 0;
        for chunk in chunks {
            let outcome = session.execute(&chunk.sql, &chunk.params)?;
            debug!(
                table = %self.table,
                rows = ?chunk.rows,
                rows_affected = outcome.rows_affected,
                "Batch chunk written"
            );
            affected += outcome.rows_affected;
        }
        info!(
            table = %self.table,
            rows = plan.total_rows(),
            chunks = plan.chunk_count(),
            rows_affected = affected,
            "Batch insert finished"
        );
        Ok(affected)
    }

    /// The columns an upsert on this table conflicts on.
    ///
    /// Empty for dialects that resolve conflicts against every unique key.
    pub fn conflict_columns(&self, session: &mut Session) -> Result<Vec<String>> {
        let dialect = session.dialect();
        let Some((sql, params)) = dialect.conflict_columns_query(&self.table) else {
            return Ok(Vec::new());
        };
        let rows = session.fetch_all(&sql, &params)?;
        Ok(dialect.conflict_columns(&rows, &self.primary_key))
    }
}

impl From<&str> for Model {
    fn from(table: &str) -> Self {
        Self::new(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sqlite::SqliteConnection;
    use sqlbatch_core::{row, ColumnSpec, TableSchema, ValidationError};
    use std::sync::{Arc, Mutex};

    fn session() -> Session {
        let mut session = Session::new(SqliteConnection::in_memory().unwrap()).unwrap();
        let schema = TableSchema::builder("items")
            .column(ColumnSpec::new("id", "int").auto_increment().primary_key())
            .column(ColumnSpec::new("name", "varchar(64)").unique())
            .column(ColumnSpec::new("qty", "int"))
            .build()
            .unwrap();
        session.create_table(schema).execute().unwrap();
        session
    }

    #[test]
    fn test_insert_and_find() {
        let mut session = session();
        let mut items = Model::new("items");
        let id = items
            .insert(&mut session, row! { "name" => "a", "qty" => 3 }, false)
            .unwrap();
        assert_eq!(id, Some(1));

        let found = items.find(&mut session, 1).unwrap().unwrap();
        assert_eq!(found.get("qty"), Some(&SqlValue::Int(3)));
        assert!(items.find(&mut session, 9).unwrap().is_none());
    }

    #[test]
    fn test_ignored_insert_returns_none() {
        let mut session = session();
        let mut items = Model::new("items");
        items
            .insert(&mut session, row! { "name" => "a", "qty" => 1 }, true)
            .unwrap();
        let again = items
            .insert(&mut session, row! { "name" => "a", "qty" => 2 }, true)
            .unwrap();
        assert_eq!(again, None);
        assert_eq!(items.count(&mut session, Filter::new()).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_driver_error() {
        let mut session = session();
        let mut items = Model::new("items");
        items
            .insert(&mut session, row! { "name" => "a" }, false)
            .unwrap();
        let err = items
            .insert(&mut session, row! { "name" => "a" }, false)
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[test]
    fn test_aggregates() {
        let mut session = session();
        let items = Model::new("items");
        let rows = vec![
            row! { "name" => "a", "qty" => 3 },
            row! { "name" => "b", "qty" => 5 },
            row! { "name" => "c", "qty" => 7 },
        ];
        assert_eq!(items.insert_batch(&mut session, &rows, false).unwrap(), 3);

        let over_four = Filter::new().and_where("qty", ">", 4);
        assert_eq!(items.count(&mut session, over_four.clone()).unwrap(), 2);
        assert_eq!(
            items.max(&mut session, "qty", Filter::new()).unwrap(),
            Some(SqlValue::Int(7))
        );
        assert_eq!(
            items.min(&mut session, "qty", over_four).unwrap(),
            Some(SqlValue::Int(5))
        );
        assert_eq!(
            items.sum(&mut session, "qty").unwrap(),
            Some(SqlValue::Int(15))
        );
    }

    #[test]
    fn test_aggregate_over_nothing_is_none() {
        let mut session = session();
        let items = Model::new("items");
        assert_eq!(items.max(&mut session, "qty", Filter::new()).unwrap(), None);
        assert_eq!(items.count(&mut session, Filter::new()).unwrap(), 0);
    }

    #[test]
    fn test_update_increment_delete() {
        let mut session = session();
        let mut items = Model::new("items");
        items
            .insert(&mut session, row! { "name" => "a", "qty" => 1 }, false)
            .unwrap();

        assert_eq!(
            items
                .update(&mut session, 1, row! { "name" => "renamed" })
                .unwrap(),
            1
        );
        assert_eq!(items.increment(&mut session, 1, "qty", 4).unwrap(), 1);
        let row = items.find(&mut session, 1).unwrap().unwrap();
        assert_eq!(row.get("name"), Some(&SqlValue::Text("renamed".into())));
        assert_eq!(row.get("qty"), Some(&SqlValue::Int(5)));

        assert_eq!(items.delete(&mut session, 1).unwrap(), 1);
        assert_eq!(items.delete(&mut session, 1).unwrap(), 0);
    }

    #[test]
    fn test_insert_update_single_row() {
        let mut session = session();
        let items = Model::new("items");
        items
            .insert_update(
                &mut session,
                row! { "name" => "a", "qty" => 1 },
                row! { "qty" => 10 },
            )
            .unwrap();
        items
            .insert_update(
                &mut session,
                row! { "name" => "a", "qty" => 1 },
                row! { "qty" => 10 },
            )
            .unwrap();
        let qty = items
            .select()
            .columns(["qty"])
            .where_eq("name", "a")
            .value(&mut session)
            .unwrap();
        assert_eq!(qty, Some(SqlValue::Int(10)));
    }

    #[test]
    fn test_conflict_columns_prefer_unique_index() {
        let mut session = session();
        let items = Model::new("items");
        assert_eq!(
            items.conflict_columns(&mut session).unwrap(),
            vec![String::from("name")]
        );
    }

    #[test]
    fn test_observer_sees_pre_and_post_images() {
        let mut session = session();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut items = Model::new("items").on_change(move |event: &ChangeEvent| {
            sink.lock().unwrap().push((event.kind, event.row.get("qty").cloned()));
        });

        items
            .insert(&mut session, row! { "name" => "a", "qty" => 1 }, false)
            .unwrap();
        items.increment(&mut session, 1, "qty", 1).unwrap();
        items.delete(&mut session, 1).unwrap();
        // Nothing left to delete, so nothing is reported.
        items.delete(&mut session, 1).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                (ChangeKind::Insert, Some(SqlValue::Int(1))),
                (ChangeKind::Increment, Some(SqlValue::Int(1))),
                (ChangeKind::Delete, Some(SqlValue::Int(2))),
            ]
        );
    }

    #[test]
    fn test_missing_table_is_rejected() {
        let mut session = session();
        let mut model = Model::new("");
        let err = model.delete(&mut session, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingTable)
        ));

        let mut model = Model::new("items").with_primary_key(" ");
        let err = model.delete(&mut session, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingPrimaryKey)
        ));
    }

    #[test]
    fn test_empty_filter_touches_nothing() {
        let mut session = session();
        let mut items = Model::new("items");
        let rows = vec![
            row! { "name" => "a", "qty" => 1 },
            row! { "name" => "b", "qty" => 2 },
        ];
        items.insert_batch(&mut session, &rows, false).unwrap();

        assert_eq!(
            items
                .update_where(&mut session, Filter::new(), row! { "qty" => 0 })
                .unwrap(),
            0
        );
        assert_eq!(items.delete_where(&mut session, Filter::new()).unwrap(), 0);

        assert_eq!(items.count(&mut session, Filter::new()).unwrap(), 2);
        assert_eq!(
            items.sum(&mut session, "qty").unwrap(),
            Some(SqlValue::Int(3))
        );
    }
}
