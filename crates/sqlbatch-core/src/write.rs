//! Single-statement INSERT, UPDATE and DELETE compilation.
//!
//! These are the building blocks of the model-level write helpers. Multi-row
//! inserts live in [`crate::batch`].

use crate::dialect::{Dialect, SqlDialect};
use crate::error::{Result, ValidationError};
use crate::predicate::{Conditional, Filter};
use crate::value::{Row, SqlValue, ToSqlValue};

/// Leading verb of an insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertVerb {
    /// `INSERT`
    #[default]
    Insert,
    /// `INSERT IGNORE` / `INSERT OR IGNORE`
    InsertIgnore,
    /// `REPLACE`
    Replace,
}

/// A single-row INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: String,
    row: Row,
    verb: InsertVerb,
    on_conflict: Option<(Vec<String>, Row)>,
}

impl Insert {
    /// Inserts `row` into `table`.
    #[must_use]
    pub fn new(table: impl Into<String>, row: Row) -> Self {
        Self {
            table: table.into(),
            row,
            verb: InsertVerb::Insert,
            on_conflict: None,
        }
    }

    /// Skips the row if it conflicts with a unique key.
    #[must_use]
    pub fn ignore(mut self) -> Self {
        self.verb = InsertVerb::InsertIgnore;
        self
    }

    /// Replaces any conflicting row.
    #[must_use]
    pub fn replace(mut self) -> Self {
        self.verb = InsertVerb::Replace;
        self
    }

    /// On conflict, assigns the values of `update` instead.
    ///
    /// `conflict_columns` is the conflict target for dialects that need one.
    #[must_use]
    pub fn on_conflict_update(mut self, conflict_columns: Vec<String>, update: Row) -> Self {
        self.on_conflict = Some((conflict_columns, update));
        self
    }

    /// Builds the statement for `dialect`.
    pub fn build(&self, dialect: Dialect) -> Result<(String, Vec<SqlValue>)> {
        if self.table.trim().is_empty() {
            return Err(ValidationError::MissingTable);
        }
        if self.row.is_empty() {
            return Err(ValidationError::EmptyData("insert"));
        }

        let verb = match self.verb {
            InsertVerb::Insert => "INSERT",
            InsertVerb::InsertIgnore => dialect.insert_ignore(),
            InsertVerb::Replace => "REPLACE",
        };
        let columns: Vec<String> = self
            .row
            .columns()
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();
        let placeholders = vec![SqlValue::placeholder(); columns.len()].join(", ");
        let mut sql = format!(
            "{verb} INTO {} ({}) VALUES ({placeholders})",
            dialect.quote_identifier(&self.table),
            columns.join(", ")
        );
        let mut params = self.row.values().to_vec();

        if let Some((conflict_columns, update)) = &self.on_conflict {
            if update.is_empty() {
                return Err(ValidationError::EmptyData("update"));
            }
            let assignments: Vec<String> = update
                .columns()
                .iter()
                .map(|c| format!("{} = ?", dialect.quote_identifier(c)))
                .collect();
            sql.push(' ');
            sql.push_str(&dialect.upsert_clause(conflict_columns, &assignments));
            params.extend(update.values().iter().cloned());
        }

        Ok((sql, params))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Assignment {
    Set(String, SqlValue),
    Increment(String, SqlValue),
}

/// An UPDATE over the rows matching a filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    table: String,
    assignments: Vec<Assignment>,
    filter: Filter,
}

impl Update {
    /// Starts an update of `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// `column = value`
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.assignments
            .push(Assignment::Set(column.into(), value.to_sql_value()));
        self
    }

    /// Sets every column of `row`.
    #[must_use]
    pub fn set_row(mut self, row: Row) -> Self {
        let (columns, values) = row.into_parts();
        self.assignments.extend(
            columns
                .into_iter()
                .zip(values)
                .map(|(column, value)| Assignment::Set(column, value)),
        );
        self
    }

    /// `column = column + amount`
    #[must_use]
    pub fn increment(mut self, column: impl Into<String>, amount: impl ToSqlValue) -> Self {
        self.assignments
            .push(Assignment::Increment(column.into(), amount.to_sql_value()));
        self
    }

    /// Builds the statement for `dialect`.
    pub fn build(&self, dialect: Dialect) -> Result<(String, Vec<SqlValue>)> {
        if self.table.trim().is_empty() {
            return Err(ValidationError::MissingTable);
        }
        if self.assignments.is_empty() {
            return Err(ValidationError::EmptyData("update"));
        }
        let (condition, filter_params) = self.filter.compile()?;

        let mut params = Vec::with_capacity(self.assignments.len() + filter_params.len());
        let mut sets = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            match assignment {
                Assignment::Set(column, value) => {
                    sets.push(format!("{} = ?", dialect.quote_identifier(column)));
                    params.push(value.clone());
                }
                Assignment::Increment(column, amount) => {
                    let quoted = dialect.quote_identifier(column);
                    sets.push(format!("{quoted} = {quoted} + ?"));
                    params.push(amount.clone());
                }
            }
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_identifier(&self.table),
            sets.join(", ")
        );
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        params.extend(filter_params);
        Ok((sql, params))
    }
}

impl Conditional for Update {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }
}

/// A DELETE over the rows matching a filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delete {
    table: String,
    filter: Filter,
}

impl Delete {
    /// Starts a delete from `table`.
    #[must_use]
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: Filter::new(),
        }
    }

    /// Builds the statement for `dialect`.
    pub fn build(&self, dialect: Dialect) -> Result<(String, Vec<SqlValue>)> {
        if self.table.trim().is_empty() {
            return Err(ValidationError::MissingTable);
        }
        let (condition, params) = self.filter.compile()?;
        let mut sql = format!("DELETE FROM {}", dialect.quote_identifier(&self.table));
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }
        Ok((sql, params))
    }
}

impl Conditional for Delete {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }
}
