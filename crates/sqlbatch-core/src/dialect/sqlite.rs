//! SQLite dialect implementation.

use super::SqlDialect;
use crate::schema::ColumnSpec;
use crate::value::{Row, SqlValue};

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '"'
    }

    // SQLITE_MAX_VARIABLE_NUMBER default since 3.32.0
    fn max_bind_params(&self) -> usize {
        32_766
    }

    fn render_auto_increment(&self, _declared_type: &str) -> (String, &'static str) {
        (String::from("INTEGER"), "AUTOINCREMENT")
    }

    fn column_constraints(&self, column: &ColumnSpec) -> Vec<&'static str> {
        // AUTOINCREMENT is only legal directly after INTEGER PRIMARY KEY,
        // which already implies NOT NULL and UNIQUE.
        if column.auto_increment && column.primary_key {
            return vec!["PRIMARY KEY", "AUTOINCREMENT"];
        }
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
            parts.push("AUTOINCREMENT");
        }
        parts
    }

    fn table_options(&self, _engine: Option<&str>, _collation: Option<&str>) -> Vec<String> {
        Vec::new()
    }

    fn insert_ignore(&self) -> &'static str {
        "INSERT OR IGNORE"
    }

    fn inserted_value(&self, column: &str) -> String {
        format!("excluded.{}", self.quote_identifier(column))
    }

    fn upsert_clause(&self, conflict_columns: &[String], assignments: &[String]) -> String {
        if conflict_columns.is_empty() {
            return format!("ON CONFLICT DO UPDATE SET {}", assignments.join(", "));
        }
        let target: Vec<String> = conflict_columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        format!(
            "ON CONFLICT({}) DO UPDATE SET {}",
            target.join(", "),
            assignments.join(", ")
        )
    }

    fn conflict_columns_query(&self, table: &str) -> Option<(String, Vec<SqlValue>)> {
        let sql = "SELECT il.name AS index_name, il.origin AS origin, ii.name AS column_name \
                   FROM pragma_index_list(?) AS il, pragma_index_info(il.name) AS ii \
                   WHERE il.\"unique\" = 1 AND il.partial = 0 \
                   ORDER BY il.seq, ii.seqno";
        Some((sql.to_string(), vec![SqlValue::Text(table.to_string())]))
    }

    /// Picks the first unique index that was not created for the primary
    /// key. Tables without one conflict on the primary key itself.
    fn conflict_columns(&self, index_rows: &[Row], primary_key: &str) -> Vec<String> {
        let text = |row: &Row, column: &str| {
            row.get(column)
                .and_then(SqlValue::as_str)
                .map(str::to_string)
        };

        let mut chosen: Option<String> = None;
        let mut columns = Vec::new();
        for row in index_rows {
            let (Some(index), Some(column)) = (text(row, "index_name"), text(row, "column_name"))
            else {
                continue;
            };
            match &chosen {
                Some(name) if *name == index => columns.push(column),
                Some(_) => break,
                None => {
                    if text(row, "origin").as_deref() == Some("pk") {
                        continue;
                    }
                    chosen = Some(index);
                    columns.push(column);
                }
            }
        }

        if columns.is_empty() {
            vec![primary_key.to_string()]
        } else {
            columns
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::UpsertPolicy;
    use crate::row;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.insert_ignore(), "INSERT OR IGNORE");
        assert!(dialect.table_options(Some("InnoDB"), Some("x")).is_empty());
    }

    #[test]
    fn test_auto_increment_rewrites_type() {
        let column = ColumnSpec::new("id", "int").auto_increment().primary_key();
        assert_eq!(
            SqliteDialect.render_auto_increment(&column.declared_type),
            (String::from("INTEGER"), "AUTOINCREMENT")
        );
        assert_eq!(
            SqliteDialect.column_constraints(&column.not_null().unique()),
            ["PRIMARY KEY", "AUTOINCREMENT"]
        );
    }

    #[test]
    fn test_upsert_clause() {
        let policy = UpsertPolicy::new().update(["name"]).increment(["count"]);
        let target = vec![String::from("foo"), String::from("bar")];
        assert_eq!(
            SqliteDialect.render_upsert(&target, &policy),
            "ON CONFLICT(\"foo\", \"bar\") DO UPDATE SET \"name\" = excluded.\"name\", \
             \"count\" = \"count\" + excluded.\"count\""
        );
    }

    #[test]
    fn test_conflict_columns_skip_primary_key_index() {
        let rows = vec![
            row! { "index_name" => "sqlite_autoindex_t_1", "origin" => "pk", "column_name" => "code" },
            row! { "index_name" => "idx_foo_bar", "origin" => "c", "column_name" => "foo" },
            row! { "index_name" => "idx_foo_bar", "origin" => "c", "column_name" => "bar" },
            row! { "index_name" => "idx_other", "origin" => "c", "column_name" => "baz" },
        ];
        assert_eq!(SqliteDialect.conflict_columns(&rows, "code"), ["foo", "bar"]);
    }

    #[test]
    fn test_conflict_columns_fall_back_to_primary_key() {
        assert_eq!(SqliteDialect.conflict_columns(&[], "id"), ["id"]);

        let rows = vec![row! { "index_name" => "pk_idx", "origin" => "pk", "column_name" => "id" }];
        assert_eq!(SqliteDialect.conflict_columns(&rows, "id"), ["id"]);
    }

    #[test]
    fn test_conflict_columns_query_binds_table() {
        let (sql, params) = SqliteDialect.conflict_columns_query("users").unwrap();
        assert!(sql.contains("pragma_index_list(?)"));
        assert_eq!(params, vec![SqlValue::Text("users".into())]);
    }
}
