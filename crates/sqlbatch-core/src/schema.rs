//! Table definitions and `CREATE TABLE` generation.
//!
//! A [`TableSchema`] is assembled with [`TableSchemaBuilder`] (or read from
//! JSON) and compiled against a [`Dialect`]. The dialect decides how
//! auto-increment columns are spelled and whether table options such as the
//! storage engine are emitted at all.
//!
//! ```rust
//! use sqlbatch_core::dialect::Dialect;
//! use sqlbatch_core::schema::{ColumnSpec, TableSchema};
//!
//! let schema = TableSchema::builder("test_table")
//!     .column(ColumnSpec::new("id", "int").auto_increment().primary_key())
//!     .column(ColumnSpec::new("foo", "varchar(255)").not_null())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     schema.compile(Dialect::Sqlite),
//!     r#"CREATE TABLE "test_table" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "foo" varchar(255) NOT NULL)"#
//! );
//! ```

use serde::Deserialize;

use crate::dialect::{Dialect, SqlDialect};
use crate::error::{Result, ValidationError};

/// Declared type used when a column does not name one.
pub const DEFAULT_COLUMN_TYPE: &str = "int";

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared SQL type, passed through verbatim.
    #[serde(rename = "type", default = "default_column_type")]
    pub declared_type: String,
    /// Auto-increment flag.
    #[serde(default)]
    pub auto_increment: bool,
    /// Primary key flag.
    #[serde(default)]
    pub primary_key: bool,
    /// NOT NULL flag.
    #[serde(default)]
    pub not_null: bool,
    /// UNIQUE flag.
    #[serde(default)]
    pub unique: bool,
}

fn default_column_type() -> String {
    String::from(DEFAULT_COLUMN_TYPE)
}

impl ColumnSpec {
    /// Creates a column with the given name and declared type.
    #[must_use]
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            auto_increment: false,
            primary_key: false,
            not_null: false,
            unique: false,
        }
    }

    /// Marks the column as auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Renders the column definition for `dialect`.
    #[must_use]
    pub fn compile(&self, dialect: Dialect) -> String {
        let declared = if self.auto_increment {
            dialect.render_auto_increment(&self.declared_type).0
        } else {
            self.declared_type.clone()
        };
        let mut sql = format!("{} {declared}", dialect.quote_identifier(&self.name));
        for constraint in dialect.column_constraints(self) {
            sql.push(' ');
            sql.push_str(constraint);
        }
        sql
    }
}

/// A validated table definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TableSchemaDef")]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnSpec>,
    if_not_exists: bool,
    engine: Option<String>,
    collation: Option<String>,
}

impl TableSchema {
    /// Starts a builder for `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder::new(name)
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Storage engine, if any.
    #[must_use]
    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    /// Collation, if any.
    #[must_use]
    pub fn collation(&self) -> Option<&str> {
        self.collation.as_deref()
    }

    /// Returns `true` when the dialect will drop configured table options.
    #[must_use]
    pub fn has_ignored_options(&self, dialect: Dialect) -> bool {
        (self.engine.is_some() || self.collation.is_some())
            && dialect
                .table_options(self.engine(), self.collation())
                .is_empty()
    }

    /// Compiles the `CREATE TABLE` statement.
    #[must_use]
    pub fn compile(&self, dialect: Dialect) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if self.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&dialect.quote_identifier(&self.name));
        sql.push_str(" (");
        let column_defs: Vec<String> = self.columns.iter().map(|c| c.compile(dialect)).collect();
        sql.push_str(&column_defs.join(", "));
        sql.push(')');

        for option in dialect.table_options(self.engine(), self.collation()) {
            sql.push(' ');
            sql.push_str(&option);
        }
        sql
    }
}

/// Builder for [`TableSchema`].
#[derive(Debug, Clone, Default)]
pub struct TableSchemaBuilder {
    name: String,
    columns: Vec<ColumnSpec>,
    if_not_exists: bool,
    engine: Option<String>,
    collation: Option<String>,
}

impl TableSchemaBuilder {
    /// Creates a builder for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Emits `IF NOT EXISTS`.
    #[must_use]
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Sets the storage engine (MySQL only).
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Sets the table collation (MySQL only).
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Validates and finishes the definition.
    pub fn build(self) -> Result<TableSchema> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingTable);
        }
        if self.columns.is_empty() {
            return Err(ValidationError::NoColumns(self.name));
        }
        Ok(TableSchema {
            name: self.name,
            columns: self.columns,
            if_not_exists: self.if_not_exists,
            engine: self.engine,
            collation: self.collation,
        })
    }
}

#[derive(Deserialize)]
struct TableSchemaDef {
    name: String,
    columns: Vec<ColumnSpec>,
    #[serde(default)]
    if_not_exists: bool,
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    collation: Option<String>,
}

impl TryFrom<TableSchemaDef> for TableSchema {
    type Error = ValidationError;

    fn try_from(def: TableSchemaDef) -> Result<Self> {
        TableSchemaBuilder {
            name: def.name,
            columns: def.columns,
            if_not_exists: def.if_not_exists,
            engine: def.engine,
            collation: def.collation,
        }
        .build()
    }
}
