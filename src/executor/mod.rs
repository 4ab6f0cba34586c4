//! The two primitives every statement goes through.
//!
//! Both acquire a pooled connection for the duration of one statement,
//! translate portable `?` placeholders to the driver's style and log the final
//! SQL with its arguments before running it.

pub mod placeholder;

use crate::connection::pool::ConnectionPool;
use crate::core::{OrmError, Result, Row, Value};
use tracing::{error, info, warn};

pub use placeholder::{PlaceholderStyle, count_placeholders};

fn log(sql: &str, args: &[Value]) {
    info!("SQL: {} args: {:?}", sql, args);
}

/// Runs a read statement, returning every row or at most `limit` rows.
///
/// Driver errors propagate unchanged.
pub async fn select(
    pool: &ConnectionPool,
    sql: &str,
    args: &[Value],
    limit: Option<usize>,
) -> Result<Vec<Row>> {
    let mut conn = pool.acquire().await?;
    let sql = conn.placeholder_style().translate(sql);
    log(&sql, args);

    let rows = conn.query(&sql, args, limit).await?;
    info!("rows returned: {}", rows.len());
    Ok(rows)
}

/// Runs a write statement and returns the number of affected rows.
///
/// With `autocommit` off the statement runs inside an explicit transaction
/// that commits only on success. Any failure rolls that transaction back and
/// is returned to the caller as-is.
pub async fn execute(
    pool: &ConnectionPool,
    sql: &str,
    args: &[Value],
    autocommit: bool,
) -> Result<u64> {
    let mut conn = pool.acquire().await?;
    let sql = conn.placeholder_style().translate(sql);
    log(&sql, args);

    let outcome = async {
        if !autocommit {
            conn.begin().await?;
        }
        let affected = conn.execute(&sql, args).await?;
        if !autocommit {
            conn.commit().await?;
        }
        Ok::<u64, OrmError>(affected)
    }
    .await;

    match outcome {
        Ok(affected) => Ok(affected),
        Err(err) => {
            if conn.is_in_transaction() {
                if let Err(rollback_err) = conn.rollback().await {
                    warn!("rollback failed: {}", rollback_err);
                }
            }
            error!("SQL failed: {} args: {:?}: {}", sql, args, err);
            Err(err)
        }
    }
}
