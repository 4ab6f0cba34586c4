pub mod error;
pub mod value;

pub use error::{BoxError, OrmError, Result};
pub use value::{FromValue, Value};

/// One result row: column name to value, in result order.
pub type Row = indexmap::IndexMap<String, Value>;
