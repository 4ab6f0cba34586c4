//! Everything an application needs to declare models and query them.

pub use crate::{
    ConnectionConfig, ConnectionPool, Field, FindOptions, Limit, Model, Value, create_pool,
    global_pool, model, next_id, now,
};

#[cfg(feature = "mysql")]
pub use crate::MySqlConnector;
