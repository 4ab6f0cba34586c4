//! MySQL driver built on `sqlx`.

use super::{Connection, Connector, config::ConnectionConfig};
use crate::core::{OrmError, Result, Row, Value};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection as _, Executor, Row as _, TypeInfo};

/// Opens plain `sqlx` MySQL connections from a [`ConnectionConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.db)
            .charset(mysql_charset(&config.charset));

        let mut conn = options.connect().await?;
        if !config.autocommit {
            conn.execute("SET autocommit=0").await?;
        }
        Ok(Box::new(MySqlDriverConnection { conn }))
    }
}

/// `utf-8` is the portable spelling; MySQL wants `utf8mb4`.
fn mysql_charset(charset: &str) -> &str {
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => "utf8mb4",
        _ => charset,
    }
}

pub struct MySqlDriverConnection {
    conn: MySqlConnection,
}

fn bind_all<'q>(
    sql: &'q str,
    args: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    let mut query = sqlx::query(sql);
    for arg in args {
        query = match arg {
            Value::Null => query.bind(None::<String>),
            Value::Boolean(b) => query.bind(*b),
            Value::Integer(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut decoded = Row::with_capacity(row.columns().len());
    for column in row.columns() {
        let index = column.ordinal();
        let value = decode_column(row, index, column.type_info().name())?;
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value> {
    if type_name == "BOOLEAN" {
        let value: Option<bool> = row.try_get(index)?;
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<u64>, _>(index) {
        return Ok(match value {
            None => Value::Null,
            Some(v) => i64::try_from(v)
                .map(Value::Integer)
                .unwrap_or(Value::Float(v as f64)),
        });
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<f32>, _>(index) {
        return Ok(value.map(f64::from).into());
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value.into());
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Ok(value
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .into());
    }
    Err(OrmError::TypeMismatch(format!(
        "unsupported MySQL column type {}",
        type_name
    )))
}

#[async_trait]
impl Connection for MySqlDriverConnection {
    async fn query(&mut self, sql: &str, args: &[Value], limit: Option<usize>) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        let mut stream = bind_all(sql, args).fetch(&mut self.conn);
        while let Some(row) = stream.try_next().await? {
            rows.push(decode_row(&row)?);
            if limit.is_some_and(|n| rows.len() >= n) {
                break;
            }
        }
        Ok(rows)
    }

    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64> {
        let done = bind_all(sql, args).execute(&mut self.conn).await?;
        Ok(done.rows_affected())
    }

    async fn begin(&mut self) -> Result<()> {
        self.conn.execute("START TRANSACTION").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn.execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.conn.execute("ROLLBACK").await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }
}
