//! Row entities and their query helpers.
//!
//! A model is a struct wrapping a [`Record`], declared with [`crate::model!`].
//! Its table metadata is derived once, on first use or through
//! [`crate::schema::register`], and every query helper builds on the
//! templates stored there.

mod macros;
pub mod query;
pub mod record;

pub use query::{FindOptions, Limit};
pub use record::Record;

use crate::connection::pool::ConnectionPool;
use crate::core::{OrmError, Result, Row, Value};
use crate::executor;
use crate::schema::{ModelDecl, TableMeta, registry};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

#[async_trait]
pub trait Model: Sized + Send + Sync + 'static {
    /// Table override and fields, in declaration order.
    fn declare() -> ModelDecl;

    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Registered metadata. Fails with a schema error for an invalid
    /// declaration, on every call.
    fn meta() -> Result<Arc<TableMeta>> {
        registry::register::<Self>()
    }

    /// An instance with no values set.
    fn create() -> Result<Self> {
        Ok(Self::from_record(Record::new(Self::meta()?)))
    }

    fn from_values<I, K, V>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Record::from_values(Self::meta()?, values).map(Self::from_record)
    }

    fn from_row(row: Row) -> Result<Self> {
        Record::from_row(Self::meta()?, row).map(Self::from_record)
    }

    async fn find_all(pool: &ConnectionPool, options: FindOptions) -> Result<Vec<Self>> {
        let meta = Self::meta()?;
        let (sql, args) = query::build_select(&meta, &options)?;
        let rows = executor::select(pool, &sql, &args, None).await?;

        rows.into_iter()
            .map(|row| Record::from_row(Arc::clone(&meta), row).map(Self::from_record))
            .collect()
    }

    async fn find(pool: &ConnectionPool, primary_key: Value) -> Result<Option<Self>> {
        let meta = Self::meta()?;
        let sql = query::build_find(&meta);
        let rows = executor::select(pool, &sql, &[primary_key], Some(1)).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(Self::from_record(Record::from_row(meta, row)?))),
            None => Ok(None),
        }
    }

    /// Runs an aggregate such as `count(id)` and returns its value, or `None`
    /// when the query yields no row.
    async fn find_number(
        pool: &ConnectionPool,
        selected: &str,
        where_clause: Option<&str>,
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let meta = Self::meta()?;
        let sql = query::build_number(&meta, selected, where_clause);
        let rows = executor::select(pool, &sql, &args, Some(1)).await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| row.shift_remove("_num_")))
    }

    /// Inserts the row. Unset fields, primary key included, take their
    /// defaults first.
    async fn save(&mut self, pool: &ConnectionPool) -> Result<u64> {
        let meta = Arc::clone(self.record().meta());
        let record = self.record_mut();

        let mut args = Vec::with_capacity(meta.fields().len() + 1);
        for attribute in meta.fields() {
            args.push(record.resolve(attribute)?);
        }
        args.push(record.resolve(meta.primary_key())?);

        let affected =
            executor::execute(pool, meta.insert_sql(), &args, pool.config().autocommit).await?;
        if affected != 1 {
            warn!("failed to insert record: affected rows: {}", affected);
        }
        Ok(affected)
    }

    /// Writes every non-key field of the row identified by its primary key.
    async fn update(&self, pool: &ConnectionPool) -> Result<u64> {
        let meta = self.record().meta();
        let sql = meta.update_sql().ok_or_else(|| {
            OrmError::Schema(format!("Model '{}' has no fields to update", meta.type_name()))
        })?;

        let record = self.record();
        let mut args: Vec<Value> = meta.fields().iter().map(|f| record.value(f)).collect();
        args.push(record.primary_key_value());

        let affected = executor::execute(pool, sql, &args, pool.config().autocommit).await?;
        if affected != 1 {
            warn!("failed to update by primary key: affected rows: {}", affected);
        }
        Ok(affected)
    }

    async fn remove(&self, pool: &ConnectionPool) -> Result<u64> {
        let record = self.record();
        let args = [record.primary_key_value()];

        let affected = executor::execute(
            pool,
            record.meta().delete_sql(),
            &args,
            pool.config().autocommit,
        )
        .await?;
        if affected != 1 {
            warn!("failed to remove by primary key: affected rows: {}", affected);
        }
        Ok(affected)
    }
}
