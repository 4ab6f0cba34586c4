pub mod field;
pub mod meta;
pub mod registry;

pub use field::{ColumnType, DefaultValue, Field, FieldKind};
pub use meta::{ModelDecl, TableMeta};
pub use registry::{is_registered, lookup, register};
