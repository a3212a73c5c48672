//! MySQL dialect implementation.

use super::SqlDialect;
use crate::value::{Row, SqlValue};

/// MySQL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn max_bind_params(&self) -> usize {
        65_535
    }

    fn render_auto_increment(&self, declared_type: &str) -> (String, &'static str) {
        (declared_type.to_string(), "AUTO_INCREMENT")
    }

    fn table_options(&self, engine: Option<&str>, collation: Option<&str>) -> Vec<String> {
        let mut options = Vec::new();
        if let Some(engine) = engine {
            options.push(format!("ENGINE={engine}"));
        }
        if let Some(collation) = collation {
            options.push(format!("COLLATE {collation}"));
        }
        options
    }

    fn insert_ignore(&self) -> &'static str {
        "INSERT IGNORE"
    }

    fn inserted_value(&self, column: &str) -> String {
        format!("VALUES({})", self.quote_identifier(column))
    }

    fn upsert_clause(&self, _conflict_columns: &[String], assignments: &[String]) -> String {
        format!("ON DUPLICATE KEY UPDATE {}", assignments.join(", "))
    }

    // MySQL resolves conflicts against every unique key on its own.
    fn conflict_columns_query(&self, _table: &str) -> Option<(String, Vec<SqlValue>)> {
        None
    }

    fn conflict_columns(&self, _index_rows: &[Row], _primary_key: &str) -> Vec<String> {
        Vec::new()
    }
}
