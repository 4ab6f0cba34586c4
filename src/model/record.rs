use crate::core::{FromValue, OrmError, Result, Row, Value};
use crate::schema::TableMeta;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;

/// Field values of one row, keyed by the declared attribute names of its model.
#[derive(Debug, Clone)]
pub struct Record {
    meta: Arc<TableMeta>,
    values: IndexMap<String, Value>,
}

impl Record {
    pub fn new(meta: Arc<TableMeta>) -> Self {
        Self {
            meta,
            values: IndexMap::new(),
        }
    }

    /// Builds a record from attribute/value pairs. Undeclared attributes are
    /// rejected.
    pub fn from_values<I, K, V>(meta: Arc<TableMeta>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Self::new(meta);
        for (attribute, value) in values {
            record.set(attribute, value)?;
        }
        Ok(record)
    }

    /// Materializes a result row.
    pub fn from_row(meta: Arc<TableMeta>, row: Row) -> Result<Self> {
        Self::from_values(meta, row)
    }

    pub fn meta(&self) -> &Arc<TableMeta> {
        &self.meta
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.values.contains_key(attribute)
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    /// Current value without applying defaults; `Null` when unset.
    pub fn value(&self, attribute: &str) -> Value {
        self.values.get(attribute).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let attribute = attribute.into();
        if self.meta.field(&attribute).is_none() {
            return Err(self.unknown(&attribute));
        }
        self.values.insert(attribute, value.into());
        Ok(())
    }

    /// Setter for attributes already known to be declared; used by the
    /// accessors `model!` generates.
    #[doc(hidden)]
    pub fn put(&mut self, attribute: &str, value: Value) {
        self.values.insert(attribute.to_string(), value);
    }

    /// Reads a field, falling back to its declared default when the value is
    /// missing or `Null`. A resolved default is stored, so a producer runs at
    /// most once per record and field.
    pub fn resolve(&mut self, attribute: &str) -> Result<Value> {
        let field = self
            .meta
            .field(attribute)
            .ok_or_else(|| self.unknown(attribute))?;

        if let Some(value) = self.values.get(attribute).filter(|v| !v.is_null()) {
            return Ok(value.clone());
        }

        let Some(default) = field.default() else {
            return Ok(Value::Null);
        };
        let value = default.resolve();
        debug!("using default value for {}: {}", attribute, value);
        self.values.insert(attribute.to_string(), value.clone());
        Ok(value)
    }

    pub fn resolve_as<T: FromValue>(&mut self, attribute: &str) -> Result<T> {
        let value = self.resolve(attribute)?;
        T::from_value(value).map_err(|e| match e {
            OrmError::TypeMismatch(detail) => OrmError::TypeMismatch(format!(
                "{}.{}: {}",
                self.meta.type_name(),
                attribute,
                detail
            )),
            other => other,
        })
    }

    pub fn primary_key_value(&self) -> Value {
        self.value(self.meta.primary_key())
    }

    fn unknown(&self, attribute: &str) -> OrmError {
        OrmError::UnknownField {
            model: self.meta.type_name().to_string(),
            field: attribute.to_string(),
        }
    }
}
