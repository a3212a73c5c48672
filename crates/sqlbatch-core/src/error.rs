//! Validation errors raised while compiling statements.
//!
//! Everything in this crate fails before a statement reaches a driver, so
//! there is a single error type: the caller handed us something that cannot
//! be turned into valid SQL.

/// Structurally invalid input detected at compile time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Operator outside the WHERE allow-list.
    #[error("unsupported operator '{0}' in WHERE statement")]
    UnsupportedOperator(String),

    /// `IN` / `NOT IN` was given a scalar.
    #[error("value for {operator} operator on column '{column}' must be a list")]
    ListRequired {
        /// Column the predicate applies to.
        column: String,
        /// The offending operator.
        operator: String,
    },

    /// A comparison operator was given a list.
    #[error("value for {operator} operator on column '{column}' must be a scalar")]
    ScalarRequired {
        /// Column the predicate applies to.
        column: String,
        /// The offending operator.
        operator: String,
    },

    /// `IN ()` is not valid SQL.
    #[error("empty value list for {operator} operator on column '{column}'")]
    EmptyList {
        /// Column the predicate applies to.
        column: String,
        /// The offending operator.
        operator: String,
    },

    /// A bind parameter was a composite value.
    #[error("list value at parameter {index} can't be a statement value: {value}")]
    NonScalarParameter {
        /// Zero-based position in the parameter vector.
        index: usize,
        /// Rendering of the rejected value.
        value: String,
    },

    /// Table name missing.
    #[error("database table name can't be empty")]
    MissingTable,

    /// Primary key name missing.
    #[error("primary key column name can't be empty")]
    MissingPrimaryKey,

    /// A table definition with no columns.
    #[error("table '{0}' has no columns")]
    NoColumns(String),

    /// Nothing to write.
    #[error("{0} data can't be empty")]
    EmptyData(&'static str),

    /// Rows of a batch disagree on their column layout.
    #[error("row {index} columns {found:?} do not match first row columns {expected:?}")]
    RowShapeMismatch {
        /// Index of the first offending row.
        index: usize,
        /// Column layout of row 0.
        expected: Vec<String>,
        /// Column layout of the offending row.
        found: Vec<String>,
    },

    /// A single row needs more placeholders than one statement may carry.
    #[error("row of {columns} columns exceeds the limit of {max_params} bound parameters")]
    RowTooWide {
        /// Columns per row.
        columns: usize,
        /// Configured ceiling.
        max_params: usize,
    },

    /// An upsert update/increment column is not part of the inserted row.
    #[error("upsert column '{0}' is not in the inserted columns")]
    UnknownUpsertColumn(String),

    /// The same column was listed as both update and increment.
    #[error("upsert column '{0}' can't be both updated and incremented")]
    ConflictingUpsertColumn(String),

    /// Upsert without anything to update.
    #[error("upsert needs at least one update or increment column")]
    EmptyUpsertPolicy,

    /// Driver name that maps to no known dialect.
    #[error("unsupported database driver '{0}'")]
    UnknownDialect(String),
}

/// Result type for compile-time operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
