use crate::core::Value;
use std::fmt;
use std::sync::Arc;

/// Storage type of a column, rendered as DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Varchar(u32),
    Text,
    Boolean,
    Real,
    BigInt,
    /// Raw DDL as given by the caller, e.g. `"varchar(50)"`.
    Custom(String),
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Varchar(n) => write!(f, "varchar({})", n),
            Self::Text => write!(f, "text"),
            Self::Boolean => write!(f, "boolean"),
            Self::Real => write!(f, "real"),
            Self::BigInt => write!(f, "bigint"),
            Self::Custom(ddl) => write!(f, "{}", ddl),
        }
    }
}

impl From<&str> for ColumnType {
    fn from(ddl: &str) -> Self {
        let lower = ddl.trim().to_ascii_lowercase();
        if let Some(len) = lower
            .strip_prefix("varchar(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|n| n.trim().parse().ok())
        {
            return Self::Varchar(len);
        }
        match lower.as_str() {
            "text" => Self::Text,
            "boolean" | "bool" => Self::Boolean,
            "real" => Self::Real,
            "bigint" => Self::BigInt,
            _ => Self::Custom(ddl.trim().to_string()),
        }
    }
}

/// How a missing field value is filled in.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces the default. Producers run on every call; memoization is the
    /// record's job.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Producer(produce) => produce(),
        }
    }

    pub fn is_producer(&self) -> bool {
        matches!(self, Self::Producer(_))
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(<fn>)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    Float,
    Integer,
    Text,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "StringField",
            Self::Boolean => "BooleanField",
            Self::Float => "FloatField",
            Self::Integer => "IntegerField",
            Self::Text => "TextField",
        };
        f.write_str(name)
    }
}

/// Column descriptor: name, storage type, primary-key flag and default policy.
///
/// Built with the constructors below and refined with the consuming builder
/// methods:
///
/// ```
/// use minorm::Field;
///
/// let id = Field::string()
///     .primary_key()
///     .ddl("varchar(50)")
///     .default_with(minorm::next_id);
/// assert!(id.is_primary_key());
/// assert_eq!(id.column_type().to_string(), "varchar(50)");
/// ```
#[derive(Debug, Clone)]
pub struct Field {
    name: Option<String>,
    kind: FieldKind,
    column_type: ColumnType,
    primary_key: bool,
    default: Option<DefaultValue>,
}

impl Field {
    fn with_kind(kind: FieldKind, column_type: ColumnType, default: Option<DefaultValue>) -> Self {
        Self {
            name: None,
            kind,
            column_type,
            primary_key: false,
            default,
        }
    }

    /// Short text, `varchar(100)` unless overridden with [`Field::ddl`].
    pub fn string() -> Self {
        Self::with_kind(FieldKind::String, ColumnType::Varchar(100), None)
    }

    pub fn boolean() -> Self {
        Self::with_kind(
            FieldKind::Boolean,
            ColumnType::Boolean,
            Some(DefaultValue::Literal(Value::Boolean(false))),
        )
    }

    pub fn float() -> Self {
        Self::with_kind(
            FieldKind::Float,
            ColumnType::Real,
            Some(DefaultValue::Literal(Value::Float(0.0))),
        )
    }

    pub fn integer() -> Self {
        Self::with_kind(
            FieldKind::Integer,
            ColumnType::BigInt,
            Some(DefaultValue::Literal(Value::Integer(0))),
        )
    }

    pub fn text() -> Self {
        Self::with_kind(FieldKind::Text, ColumnType::Text, None)
    }

    /// Column name, when it differs from the attribute name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn ddl(mut self, ddl: &str) -> Self {
        self.column_type = ColumnType::from(ddl);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default computed by a zero-argument producer, e.g. [`crate::next_id`].
    pub fn default_with<F, V>(mut self, produce: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(move || produce().into())));
        self
    }

    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }

    pub fn column_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Binds the column name to `attribute` unless one was given explicitly.
    pub(crate) fn bind_name(mut self, attribute: &str) -> Self {
        if self.name.is_none() {
            self.name = Some(attribute.to_string());
        }
        self
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}, {}, {}>",
            self.kind,
            self.column_type,
            self.name.as_deref().unwrap_or("?")
        )
    }
}
