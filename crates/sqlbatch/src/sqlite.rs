//! SQLite connection adapter.

use std::str::FromStr;

use sqlbatch_core::{Row, SqlValue};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Database, Row as _, Sqlite, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Runtime};

use crate::connection::{is_insert, list_bind_error, Connection, ExecOutcome};
use crate::error::DriverError;

type SqliteQuery<'q> = Query<'q, Sqlite, <Sqlite as Database>::Arguments<'q>>;

/// A single SQLite connection driven by a private current-thread runtime.
pub struct SqliteConnection {
    conn: sqlx::sqlite::SqliteConnection,
    runtime: Runtime,
    last_insert_id: Option<i64>,
}

impl SqliteConnection {
    /// Opens the database file at `path`, creating it if missing.
    ///
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: &str) -> Result<Self, DriverError> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };
        Self::connect_with(options)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, DriverError> {
        Self::open(":memory:")
    }

    /// Connects with explicit options.
    pub fn connect_with(options: SqliteConnectOptions) -> Result<Self, DriverError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(DriverError::other)?;
        let conn = runtime.block_on(options.connect())?;
        Ok(Self {
            conn,
            runtime,
            last_insert_id: None,
        })
    }
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, DriverError> {
        let query = bind_all(sqlx::query(sql), params)?;
        let result = self.runtime.block_on(query.execute(&mut self.conn))?;

        let last_insert_id =
            (result.rows_affected() > 0 && is_insert(sql)).then(|| result.last_insert_rowid());
        if last_insert_id.is_some() {
            self.last_insert_id = last_insert_id;
        }
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id,
        })
    }

    fn fetch_all(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DriverError> {
        let query = bind_all(sqlx::query(sql), params)?;
        let rows = self.runtime.block_on(query.fetch_all(&mut self.conn))?;
        rows.iter().map(decode_row).collect()
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }
}

fn bind_all<'q>(
    mut query: SqliteQuery<'q>,
    params: &[SqlValue],
) -> Result<SqliteQuery<'q>, DriverError> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Blob(b) => query.bind(b.clone()),
            SqlValue::List(_) => return Err(list_bind_error()),
        };
    }
    Ok(query)
}

// SQLite is dynamically typed; decode by the storage class of each value.
fn decode_row(row: &SqliteRow) -> Result<Row, DriverError> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let (is_null, storage) = {
            let raw = row.try_get_raw(index)?;
            (raw.is_null(), raw.type_info().name().to_string())
        };
        let value = if is_null {
            SqlValue::Null
        } else {
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?),
                "REAL" => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
                "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
                _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
            }
        };
        decoded.set(column.name(), value);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_and_fetch() {
        let mut conn = SqliteConnection::in_memory().unwrap();
        conn.execute(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, score REAL, data BLOB)",
            &[],
        )
        .unwrap();

        let outcome = conn
            .execute(
                "INSERT INTO t (name, score, data) VALUES (?, ?, ?)",
                &[
                    SqlValue::Text("a".into()),
                    SqlValue::Float(1.5),
                    SqlValue::Blob(vec![0, 1]),
                ],
            )
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, Some(1));
        assert_eq!(conn.last_insert_id(), Some(1));

        let rows = conn.fetch_all("SELECT * FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&SqlValue::Int(1)));
        assert_eq!(rows[0].get("name"), Some(&SqlValue::Text("a".into())));
        assert_eq!(rows[0].get("score"), Some(&SqlValue::Float(1.5)));
        assert_eq!(rows[0].get("data"), Some(&SqlValue::Blob(vec![0, 1])));
    }

    #[test]
    fn test_null_and_update_outcome() {
        let mut conn = SqliteConnection::in_memory().unwrap();
        conn.execute("CREATE TABLE t (a INTEGER)", &[]).unwrap();
        conn.execute("INSERT INTO t (a) VALUES (?)", &[SqlValue::Null])
            .unwrap();

        let outcome = conn.execute("UPDATE t SET a = 1", &[]).unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, None);

        let rows = conn.fetch_all("SELECT a, NULL AS b FROM t", &[]).unwrap();
        assert_eq!(rows[0].get("b"), Some(&SqlValue::Null));
    }

    #[test]
    fn test_list_parameter_is_rejected() {
        let mut conn = SqliteConnection::in_memory().unwrap();
        let err = conn
            .fetch_all("SELECT ?", &[SqlValue::list([1, 2])])
            .unwrap_err();
        assert!(err.to_string().contains("list values"));
    }

    #[test]
    fn test_unique_violation_is_classified() {
        let mut conn = SqliteConnection::in_memory().unwrap();
        conn.execute("CREATE TABLE t (a TEXT UNIQUE)", &[]).unwrap();
        conn.execute("INSERT INTO t (a) VALUES ('x')", &[]).unwrap();
        let err = conn
            .execute("INSERT INTO t (a) VALUES ('x')", &[])
            .unwrap_err();
        assert!(err.is_unique_violation());
    }
}
