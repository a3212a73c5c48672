//! Executing `CREATE TABLE`.

use sqlbatch_core::{Dialect, TableSchema};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::session::Session;

/// A table definition, optionally bound to a session that will run it.
#[derive(Debug)]
pub struct CreateTable<'s> {
    session: Option<&'s mut Session>,
    schema: TableSchema,
}

impl<'s> CreateTable<'s> {
    /// Binds `schema` to `session`.
    pub fn new(session: &'s mut Session, schema: TableSchema) -> Self {
        Self {
            session: Some(session),
            schema,
        }
    }

    /// A definition with no session. It can be compiled but not executed.
    #[must_use]
    pub const fn detached(schema: TableSchema) -> CreateTable<'static> {
        CreateTable {
            session: None,
            schema,
        }
    }

    /// The table definition.
    #[must_use]
    pub const fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Compiles the statement for `dialect`.
    #[must_use]
    pub fn sql(&self, dialect: Dialect) -> String {
        self.schema.compile(dialect)
    }

    /// Runs the statement through the bound session.
    pub fn execute(self) -> Result<()> {
        let Some(session) = self.session else {
            return Err(Error::Configuration(format!(
                "no session to create table '{}' with",
                self.schema.name()
            )));
        };
        let dialect = session.dialect();
        if self.schema.has_ignored_options(dialect) {
            warn!(
                table = %self.schema.name(),
                dialect = %dialect,
                "Table options are not supported by this dialect, skipping"
            );
        }
        let sql = self.schema.compile(dialect);
        session.execute(&sql, &[])?;
        info!(table = %self.schema.name(), "Created table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqliteConnection;
    use sqlbatch_core::ColumnSpec;

    fn schema() -> TableSchema {
        TableSchema::builder("test_table")
            .column(ColumnSpec::new("id", "int").auto_increment().primary_key())
            .column(ColumnSpec::new("foo", "varchar(255)"))
            .engine("InnoDB")
            .build()
            .unwrap()
    }

    #[test]
    fn test_detached_execute_fails() {
        let err = CreateTable::detached(schema()).execute().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_detached_still_compiles() {
        let create = CreateTable::detached(schema());
        assert!(create.sql(Dialect::MySql).ends_with(" ENGINE=InnoDB"));
    }

    #[test]
    fn test_execute_on_sqlite() {
        let mut session = Session::new(SqliteConnection::in_memory().unwrap()).unwrap();
        session.create_table(schema()).execute().unwrap();
        session
            .execute("INSERT INTO test_table (foo) VALUES ('x')", &[])
            .unwrap();
        assert_eq!(session.last_insert_id(), Some(1));
    }

    #[test]
    fn test_driver_error_is_returned() {
        let mut session = Session::new(SqliteConnection::in_memory().unwrap()).unwrap();
        session.create_table(schema()).execute().unwrap();
        let err = session.create_table(schema()).execute().unwrap_err();
        assert!(matches!(err, Error::Driver { .. }));
    }
}
