//! SQL dialect support.
//!
//! The compilers branch on the target database in a handful of places:
//! auto-increment columns, table options, `INSERT IGNORE`, upsert clauses
//! and the bound-parameter ceiling. Those branches live behind the
//! [`SqlDialect`] capability trait. [`Dialect`] is the closed set of
//! supported targets; a session picks one from the driver name once and
//! hands it to every compiler call.

mod mysql;
mod sqlite;

use std::fmt;
use std::str::FromStr;

pub use mysql::MySqlDialect;
pub use sqlite::SqliteDialect;

use crate::batch::UpsertPolicy;
use crate::error::{Result, ValidationError};
use crate::schema::ColumnSpec;
use crate::value::{Row, SqlValue};

/// Trait for SQL dialect-specific behavior.
pub trait SqlDialect {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character.
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        format!("{quote}{name}{quote}")
    }

    /// Hard ceiling on bound parameters per prepared statement.
    fn max_bind_params(&self) -> usize;

    /// Rewrites the declared type of an auto-increment column and returns
    /// it together with the dialect's auto-increment keyword.
    fn render_auto_increment(&self, declared_type: &str) -> (String, &'static str);

    /// Constraint keywords for a column, in the fixed order
    /// `PRIMARY KEY`, `NOT NULL`, `UNIQUE`, auto-increment marker.
    fn column_constraints(&self, column: &ColumnSpec) -> Vec<&'static str> {
        let mut parts = Vec::new();
        if column.primary_key {
            parts.push("PRIMARY KEY");
        }
        if column.not_null {
            parts.push("NOT NULL");
        }
        if column.unique {
            parts.push("UNIQUE");
        }
        if column.auto_increment {
            parts.push(self.render_auto_increment(&column.declared_type).1);
        }
        parts
    }

    /// Trailing `CREATE TABLE` options such as the storage engine.
    ///
    /// Dialects without table options return an empty list.
    fn table_options(&self, engine: Option<&str>, collation: Option<&str>) -> Vec<String>;

    /// Leading keywords of an insert that skips conflicting rows.
    fn insert_ignore(&self) -> &'static str;

    /// Reference to the value a conflicting insert tried to write.
    fn inserted_value(&self, column: &str) -> String;

    /// Wraps assignments into the dialect's conflict clause.
    fn upsert_clause(&self, conflict_columns: &[String], assignments: &[String]) -> String;

    /// Compiles an upsert clause for a batch insert.
    fn render_upsert(&self, conflict_columns: &[String], policy: &UpsertPolicy) -> String {
        let mut assignments = Vec::new();
        for column in policy.update_columns() {
            let quoted = self.quote_identifier(column);
            assignments.push(format!("{quoted} = {}", self.inserted_value(column)));
        }
        for column in policy.increment_columns() {
            let quoted = self.quote_identifier(column);
            assignments.push(format!(
                "{quoted} = {quoted} + {}",
                self.inserted_value(column)
            ));
        }
        self.upsert_clause(conflict_columns, &assignments)
    }

    /// Query returning unique-index metadata for `table`, if the dialect
    /// needs an explicit conflict target.
    ///
    /// Result rows carry `index_name`, `origin` and `column_name`.
    fn conflict_columns_query(&self, table: &str) -> Option<(String, Vec<SqlValue>)>;

    /// Derives the conflict target from the rows of
    /// [`SqlDialect::conflict_columns_query`].
    fn conflict_columns(&self, index_rows: &[Row], primary_key: &str) -> Vec<String>;
}

/// The closed set of supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL and MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// Maps a driver name (as reported by a connection) to a dialect.
    pub fn from_driver_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(ValidationError::UnknownDialect(name.to_string())),
        }
    }

    /// Returns `true` for the SQLite family.
    #[must_use]
    pub const fn is_sqlite(self) -> bool {
        matches!(self, Self::Sqlite)
    }

    fn imp(self) -> &'static dyn SqlDialect {
        match self {
            Self::MySql => &MySqlDialect,
            Self::Sqlite => &SqliteDialect,
        }
    }
}

impl FromStr for Dialect {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_driver_name(s)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.imp().name()
    }

    fn identifier_quote(&self) -> char {
        self.imp().identifier_quote()
    }

    fn quote_identifier(&self, name: &str) -> String {
        self.imp().quote_identifier(name)
    }

    fn max_bind_params(&self) -> usize {
        self.imp().max_bind_params()
    }

    fn render_auto_increment(&self, declared_type: &str) -> (String, &'static str) {
        self.imp().render_auto_increment(declared_type)
    }

    fn column_constraints(&self, column: &ColumnSpec) -> Vec<&'static str> {
        self.imp().column_constraints(column)
    }

    fn table_options(&self, engine: Option<&str>, collation: Option<&str>) -> Vec<String> {
        self.imp().table_options(engine, collation)
    }

    fn insert_ignore(&self) -> &'static str {
        self.imp().insert_ignore()
    }

    fn inserted_value(&self, column: &str) -> String {
        self.imp().inserted_value(column)
    }

    fn upsert_clause(&self, conflict_columns: &[String], assignments: &[String]) -> String {
        self.imp().upsert_clause(conflict_columns, assignments)
    }

    fn render_upsert(&self, conflict_columns: &[String], policy: &UpsertPolicy) -> String {
        self.imp().render_upsert(conflict_columns, policy)
    }

    fn conflict_columns_query(&self, table: &str) -> Option<(String, Vec<SqlValue>)> {
        self.imp().conflict_columns_query(table)
    }

    fn conflict_columns(&self, index_rows: &[Row], primary_key: &str) -> Vec<String> {
        self.imp().conflict_columns(index_rows, primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver_name() {
        assert_eq!(Dialect::from_driver_name("mysql").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver_name("SQLite").unwrap(), Dialect::Sqlite);
        assert_eq!(Dialect::from_driver_name(" mariadb ").unwrap(), Dialect::MySql);
        assert_eq!(
            Dialect::from_driver_name("pgsql"),
            Err(ValidationError::UnknownDialect("pgsql".into()))
        );
    }

    #[test]
    fn test_parse_and_display() {
        let dialect: Dialect = "sqlite".parse().unwrap();
        assert_eq!(dialect.to_string(), "sqlite");
        assert_eq!(Dialect::MySql.to_string(), "mysql");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::MySql.quote_identifier("users"), "`users`");
        assert_eq!(Dialect::Sqlite.quote_identifier("users"), "\"users\"");
    }
}
