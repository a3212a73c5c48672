#![allow(dead_code)]

use sqlbatch::prelude::*;
use sqlbatch::SqliteConnection;

pub fn memory_session() -> Session {
    Session::new(SqliteConnection::in_memory().unwrap()).unwrap()
}

pub fn session_with_max_params(max_params: usize) -> Session {
    Session::with_options(
        SqliteConnection::in_memory().unwrap(),
        SessionOptions { max_params },
    )
    .unwrap()
}

/// `test_table(id, foo, height, day)` with no unique keys besides `id`.
pub fn create_test_table(session: &mut Session) {
    let schema = TableSchema::builder("test_table")
        .column(ColumnSpec::new("id", "int").auto_increment().primary_key())
        .column(ColumnSpec::new("foo", "varchar(255)"))
        .column(ColumnSpec::new("height", "int"))
        .column(ColumnSpec::new("day", "int"))
        .engine("InnoDB")
        .collation("utf8_unicode_ci")
        .build()
        .unwrap();
    session.create_table(schema).execute().unwrap();
}

/// `counters(id, foo UNIQUE, count)`.
pub fn create_counters(session: &mut Session) {
    let schema = TableSchema::builder("counters")
        .column(ColumnSpec::new("id", "int").auto_increment().primary_key())
        .column(ColumnSpec::new("foo", "string").unique())
        .column(ColumnSpec::new("count", "int"))
        .build()
        .unwrap();
    session.create_table(schema).execute().unwrap();
}
