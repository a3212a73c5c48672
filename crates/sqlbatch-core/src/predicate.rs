//! WHERE clause compilation.
//!
//! A [`Filter`] is an AND-group of predicates plus an optional flat OR-group.
//! Compiling it validates every operator against the allow-list and every
//! value against its operator before a single byte of SQL is produced, then
//! renders placeholders and collects the bound values left to right.
//!
//! Column names and raw fragments are trusted text; only values are
//! parameterized.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};
use crate::value::{SqlValue, ToSqlValue};

/// Comparison operators accepted in a WHERE predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `>=`
    GtEq,
    /// `<=`
    LtEq,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IS NULL`
    Is,
    /// `IS NOT NULL`
    IsNot,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
}

impl Operator {
    /// Every accepted operator.
    pub const ALL: [Self; 12] = [
        Self::Gt,
        Self::Lt,
        Self::Eq,
        Self::NotEq,
        Self::GtEq,
        Self::LtEq,
        Self::Like,
        Self::NotLike,
        Self::Is,
        Self::IsNot,
        Self::In,
        Self::NotIn,
    ];

    /// Returns the SQL spelling of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    /// Returns `true` for `IN` and `NOT IN`.
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Returns `true` for `IS` and `IS NOT`, which ignore their value.
    #[must_use]
    pub const fn is_null_check(self) -> bool {
        matches!(self, Self::Is | Self::IsNot)
    }
}

impl FromStr for Operator {
    type Err = ValidationError;

    /// Case-insensitive; runs of whitespace inside `NOT LIKE` and friends
    /// collapse to one space.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ValidationError::UnsupportedOperator(s.to_string()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <operator> value`. The operator is kept as written and
    /// validated when the filter compiles.
    Compare {
        /// Column or expression on the left-hand side.
        column: String,
        /// Operator as supplied by the caller.
        operator: String,
        /// Right-hand side.
        value: SqlValue,
    },
    /// Trusted SQL fragment, emitted verbatim.
    Raw(String),
}

impl Predicate {
    /// Creates a comparison predicate.
    pub fn compare(
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl ToSqlValue,
    ) -> Self {
        Self::Compare {
            column: column.into(),
            operator: operator.into(),
            value: value.to_sql_value(),
        }
    }

    fn validate(&self) -> Result<()> {
        let Self::Compare {
            column,
            operator,
            value,
        } = self
        else {
            return Ok(());
        };
        let op: Operator = operator.parse()?;
        if op.is_null_check() {
            return Ok(());
        }
        match (op.takes_list(), value) {
            (true, SqlValue::List(items)) if items.is_empty() => Err(ValidationError::EmptyList {
                column: column.clone(),
                operator: op.to_string(),
            }),
            (true, SqlValue::List(items)) => {
                match items.iter().position(|item| !item.is_scalar()) {
                    Some(index) => Err(ValidationError::NonScalarParameter {
                        index,
                        value: items[index].to_string(),
                    }),
                    None => Ok(()),
                }
            }
            (true, _) => Err(ValidationError::ListRequired {
                column: column.clone(),
                operator: op.to_string(),
            }),
            (false, SqlValue::List(_)) => Err(ValidationError::ScalarRequired {
                column: column.clone(),
                operator: op.to_string(),
            }),
            (false, _) => Ok(()),
        }
    }

    fn render(&self, params: &mut Vec<SqlValue>) -> Result<String> {
        match self {
            Self::Raw(sql) => Ok(sql.clone()),
            Self::Compare {
                column,
                operator,
                value,
            } => {
                let op: Operator = operator.parse()?;
                if op.is_null_check() {
                    return Ok(format!("{column} {op} NULL"));
                }
                if let SqlValue::List(items) = value {
                    params.extend(items.iter().cloned());
                    let placeholders = vec![SqlValue::placeholder(); items.len()].join(", ");
                    return Ok(format!("{column} {op} ({placeholders})"));
                }
                params.push(value.clone());
                Ok(format!("{column} {op} {}", SqlValue::placeholder()))
            }
        }
    }
}

/// An AND-group of predicates with an optional OR-group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    and: Vec<Predicate>,
    or: Vec<Predicate>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no predicates at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.and.is_empty() && self.or.is_empty()
    }

    /// Predicates of the AND-group.
    #[must_use]
    pub fn and_predicates(&self) -> &[Predicate] {
        &self.and
    }

    /// Predicates of the OR-group.
    #[must_use]
    pub fn or_predicates(&self) -> &[Predicate] {
        &self.or
    }

    /// Appends to the AND-group.
    pub fn push(&mut self, predicate: Predicate) {
        self.and.push(predicate);
    }

    /// Appends to the OR-group.
    pub fn push_or(&mut self, predicate: Predicate) {
        self.or.push(predicate);
    }

    /// Compiles the filter into a boolean expression and its parameters.
    ///
    /// Returns `None` for the expression when the filter is empty.
    pub fn compile(&self) -> Result<(Option<String>, Vec<SqlValue>)> {
        for predicate in self.and.iter().chain(&self.or) {
            predicate.validate()?;
        }

        let mut params = Vec::new();
        let and_group = self
            .and
            .iter()
            .map(|p| p.render(&mut params))
            .collect::<Result<Vec<_>>>()?;

        if self.or.is_empty() {
            if and_group.is_empty() {
                return Ok((None, params));
            }
            return Ok((Some(and_group.join(" AND ")), params));
        }

        let mut groups = Vec::with_capacity(self.or.len() + 1);
        if !and_group.is_empty() {
            groups.push(format!("({})", and_group.join(" AND ")));
        }
        for predicate in &self.or {
            groups.push(format!("({})", predicate.render(&mut params)?));
        }
        Ok((Some(groups.join(" OR ")), params))
    }
}

/// Builders that carry a [`Filter`].
///
/// Provides the WHERE vocabulary shared by queries, updates and deletes.
pub trait Conditional: Sized {
    /// Mutable access to the underlying filter.
    fn filter_mut(&mut self) -> &mut Filter;

    /// Adds `column <operator> value` to the AND-group.
    #[must_use]
    fn and_where(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl ToSqlValue,
    ) -> Self {
        self.filter_mut()
            .push(Predicate::compare(column, operator, value));
        self
    }

    /// Adds `column <operator> value` to the OR-group.
    #[must_use]
    fn or_where(
        mut self,
        column: impl Into<String>,
        operator: impl Into<String>,
        value: impl ToSqlValue,
    ) -> Self {
        self.filter_mut()
            .push_or(Predicate::compare(column, operator, value));
        self
    }

    /// Adds a raw fragment to the AND-group.
    #[must_use]
    fn where_raw(mut self, sql: impl Into<String>) -> Self {
        self.filter_mut().push(Predicate::Raw(sql.into()));
        self
    }

    /// Adds a raw fragment to the OR-group.
    #[must_use]
    fn or_where_raw(mut self, sql: impl Into<String>) -> Self {
        self.filter_mut().push_or(Predicate::Raw(sql.into()));
        self
    }

    /// `column = value`
    #[must_use]
    fn where_eq(self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.and_where(column, "=", value)
    }

    /// `column IN (...)`
    #[must_use]
    fn where_in<T, I>(self, column: impl Into<String>, values: I) -> Self
    where
        T: ToSqlValue,
        I: IntoIterator<Item = T>,
    {
        self.and_where(column, "IN", SqlValue::list(values))
    }

    /// `column NOT IN (...)`
    #[must_use]
    fn where_not_in<T, I>(self, column: impl Into<String>, values: I) -> Self
    where
        T: ToSqlValue,
        I: IntoIterator<Item = T>,
    {
        self.and_where(column, "NOT IN", SqlValue::list(values))
    }

    /// `column IS NULL`
    #[must_use]
    fn where_null(self, column: impl Into<String>) -> Self {
        self.and_where(column, "IS", SqlValue::Null)
    }

    /// `column IS NOT NULL`
    #[must_use]
    fn where_not_null(self, column: impl Into<String>) -> Self {
        self.and_where(column, "IS NOT", SqlValue::Null)
    }

    /// Replaces the whole filter.
    #[must_use]
    fn filter(mut self, filter: Filter) -> Self {
        *self.filter_mut() = filter;
        self
    }
}

impl Conditional for Filter {
    fn filter_mut(&mut self) -> &mut Filter {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse() {
        assert_eq!("like".parse::<Operator>().unwrap(), Operator::Like);
        assert_eq!("Not   In".parse::<Operator>().unwrap(), Operator::NotIn);
        assert_eq!(" is not ".parse::<Operator>().unwrap(), Operator::IsNot);
        assert_eq!(
            "<>".parse::<Operator>(),
            Err(ValidationError::UnsupportedOperator("<>".into()))
        );
    }

    #[test]
    fn test_empty_filter() {
        assert_eq!(Filter::new().compile().unwrap(), (None, vec![]));
    }

    #[test]
    fn test_and_group() {
        let (sql, params) = Filter::new()
            .and_where("height", ">", 10)
            .and_where("name", "like", "a%")
            .compile()
            .unwrap();
        assert_eq!(sql.as_deref(), Some("height > ? AND name LIKE ?"));
        assert_eq!(params, vec![SqlValue::Int(10), SqlValue::Text("a%".into())]);
    }

    #[test]
    fn test_unknown_operator_fails_before_sql() {
        let result = Filter::new()
            .where_eq("id", 1)
            .and_where("id", "<=>", 2)
            .compile();
        assert_eq!(
            result,
            Err(ValidationError::UnsupportedOperator("<=>".into()))
        );
    }

    #[test]
    fn test_in_binds_each_item() {
        let (sql, params) = Filter::new()
            .where_in("id", [1, 3])
            .where_not_in("foo", ["x"])
            .compile()
            .unwrap();
        assert_eq!(sql.as_deref(), Some("id IN (?, ?) AND foo NOT IN (?)"));
        assert_eq!(
            params,
            vec![SqlValue::Int(1), SqlValue::Int(3), SqlValue::Text("x".into())]
        );
    }

    #[test]
    fn test_in_requires_list() {
        assert_eq!(
            Filter::new().and_where("id", "IN", 1).compile(),
            Err(ValidationError::ListRequired {
                column: "id".into(),
                operator: "IN".into(),
            })
        );
    }

    #[test]
    fn test_empty_in_list() {
        assert_eq!(
            Filter::new().where_in("id", Vec::<i64>::new()).compile(),
            Err(ValidationError::EmptyList {
                column: "id".into(),
                operator: "IN".into(),
            })
        );
    }

    #[test]
    fn test_comparison_rejects_list() {
        assert_eq!(
            Filter::new()
                .and_where("id", "=", SqlValue::list([1, 2]))
                .compile(),
            Err(ValidationError::ScalarRequired {
                column: "id".into(),
                operator: "=".into(),
            })
        );
    }

    #[test]
    fn test_null_checks_ignore_value() {
        let (sql, params) = Filter::new()
            .where_null("deleted_at")
            .and_where("bar", "is not", "ignored")
            .compile()
            .unwrap();
        assert_eq!(sql.as_deref(), Some("deleted_at IS NULL AND bar IS NOT NULL"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_or_group() {
        let (sql, params) = Filter::new()
            .where_eq("foo", "a")
            .where_eq("bar", "b")
            .or_where("id", "<", 5)
            .or_where_raw("height IS NULL")
            .compile()
            .unwrap();
        assert_eq!(
            sql.as_deref(),
            Some("(foo = ? AND bar = ?) OR (id < ?) OR (height IS NULL)")
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("a".into()),
                SqlValue::Text("b".into()),
                SqlValue::Int(5)
            ]
        );
    }

    #[test]
    fn test_or_group_without_and_group() {
        let (sql, _) = Filter::new()
            .or_where("a", "=", 1)
            .or_where("b", "=", 2)
            .compile()
            .unwrap();
        assert_eq!(sql.as_deref(), Some("(a = ?) OR (b = ?)"));
    }

    #[test]
    fn test_raw_fragment() {
        let (sql, params) = Filter::new()
            .where_raw("created_at > NOW()")
            .where_eq("id", 7)
            .compile()
            .unwrap();
        assert_eq!(sql.as_deref(), Some("created_at > NOW() AND id = ?"));
        assert_eq!(params, vec![SqlValue::Int(7)]);
    }
}
