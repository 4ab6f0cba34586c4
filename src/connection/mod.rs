pub mod config;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod pool;

use crate::core::{Result, Row, Value};
use crate::executor::placeholder::PlaceholderStyle;
use async_trait::async_trait;
use config::ConnectionConfig;

/// A single open database connection.
///
/// SQL handed to `query` and `execute` is already in the driver's native
/// placeholder style; each call prepares, binds and releases its own statement.
#[async_trait]
pub trait Connection: Send {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    /// Runs a read statement and returns all rows, or at most `limit` rows.
    async fn query(&mut self, sql: &str, args: &[Value], limit: Option<usize>) -> Result<Vec<Row>>;

    /// Runs a write statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<u64>;

    async fn begin(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens new connections for a [`pool::ConnectionPool`].
///
/// This is the seam where a real driver or a test double plugs in.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>>;
}
