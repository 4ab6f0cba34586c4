use thiserror::Error;

/// Boxed driver error carried through [`OrmError::Database`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Connection pool is not initialized; call create_pool() first")]
    PoolNotInitialized,

    #[error("Connection pool is already initialized")]
    PoolAlreadyInitialized,

    #[error("Connection pool timeout: {0}")]
    PoolTimeout(String),

    #[error("Invalid limit value: {0}")]
    InvalidLimit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Model '{model}' has no field '{field}'")]
    UnknownField { model: String, field: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("Database error: {0}")]
    Database(#[source] BoxError),
}

impl OrmError {
    /// Wraps a driver error without altering it.
    pub fn database<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Database(Box::new(err))
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }
}

pub type Result<T> = std::result::Result<T, OrmError>;

impl<T> From<std::sync::PoisonError<T>> for OrmError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(err)
    }
}
