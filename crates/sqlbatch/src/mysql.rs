//! MySQL connection adapter.

use sqlbatch_core::{Row, SqlValue};
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Database, MySql, Row as _, TypeInfo, ValueRef};
use tokio::runtime::{Builder, Runtime};

use crate::connection::{is_insert, list_bind_error, Connection, ExecOutcome};
use crate::error::DriverError;

type MySqlQuery<'q> = Query<'q, MySql, <MySql as Database>::Arguments<'q>>;

/// A single MySQL connection driven by a private current-thread runtime.
pub struct MySqlConnection {
    // Declared before the runtime so the socket closes first.
    conn: sqlx::mysql::MySqlConnection,
    runtime: Runtime,
    last_insert_id: Option<i64>,
}

impl MySqlConnection {
    /// Connects with explicit options.
    pub fn connect_with(options: &MySqlConnectOptions) -> Result<Self, DriverError> {
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

impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome, DriverError> {
        let query = bind_all(sqlx::query(sql), params)?;
        let result = self.runtime.block_on(query.execute(&mut self.conn))?;

        let last_insert_id = if result.rows_affected() > 0 && is_insert(sql) {
            i64::try_from(result.last_insert_id()).ok().filter(|id| *id > 0)
        } else {
            None
        };
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
    mut query: MySqlQuery<'q>,
    params: &[SqlValue],
) -> Result<MySqlQuery<'q>, DriverError> {
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

fn decode_row(row: &MySqlRow) -> Result<Row, DriverError> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let (is_null, type_name) = {
            let raw = row.try_get_raw(index)?;
            (raw.is_null(), raw.type_info().name().to_string())
        };
        let value = if is_null {
            SqlValue::Null
        } else {
            decode_value(row, index, &type_name)?
        };
        decoded.set(column.name(), value);
    }
    Ok(decoded)
}

fn decode_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<SqlValue, DriverError> {
    let value = match type_name {
        "BOOLEAN" => SqlValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        name if name.ends_with("UNSIGNED") => {
            let n = row.try_get_unchecked::<u64, _>(index)?;
            i64::try_from(n).map_or_else(|_| SqlValue::Text(n.to_string()), SqlValue::Int)
        }
        "FLOAT" => SqlValue::Float(f64::from(row.try_get_unchecked::<f32, _>(index)?)),
        "DOUBLE" => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "DATETIME" => {
            let dt = row.try_get_unchecked::<chrono::NaiveDateTime, _>(index)?;
            SqlValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        "TIMESTAMP" => {
            let ts = row.try_get_unchecked::<chrono::DateTime<chrono::Utc>, _>(index)?;
            SqlValue::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        "DATE" => SqlValue::Text(row.try_get_unchecked::<chrono::NaiveDate, _>(index)?.to_string()),
        "TIME" => SqlValue::Text(row.try_get_unchecked::<chrono::NaiveTime, _>(index)?.to_string()),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" | "BIT"
        | "GEOMETRY" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        "DECIMAL" | "NUMERIC" => decimal_value(row.try_get_unchecked::<String, _>(index)?),
        // Character and JSON types arrive as text.
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

/// `SUM` over integer columns and `DECIMAL` columns come back as decimal
/// text; read them as numbers where they fit.
fn decimal_value(text: String) -> SqlValue {
    if let Ok(n) = text.parse::<i64>() {
        return SqlValue::Int(n);
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => SqlValue::Float(f),
        _ => SqlValue::Text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_value() {
        assert_eq!(decimal_value("20".into()), SqlValue::Int(20));
        assert_eq!(decimal_value("-3".into()), SqlValue::Int(-3));
        assert_eq!(decimal_value("20.50".into()), SqlValue::Float(20.5));
        assert_eq!(
            decimal_value("99999999999999999999".into()),
            SqlValue::Float(1e20)
        );
        assert_eq!(decimal_value("n/a".into()), SqlValue::Text("n/a".into()));
    }
}
