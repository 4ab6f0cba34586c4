use crate::core::{OrmError, Result, Value};
use crate::schema::TableMeta;
use crate::schema::meta::quote;

/// Row-count clause of a `find_all` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// `limit ?`
    Count(u64),
    /// `limit ?, ?` as (offset, count)
    Range { offset: u64, count: u64 },
}

impl Limit {
    fn clause(&self) -> &'static str {
        match self {
            Self::Count(_) => "limit ?",
            Self::Range { .. } => "limit ?, ?",
        }
    }

    fn args(&self) -> Result<Vec<Value>> {
        match *self {
            Self::Count(count) => Ok(vec![bound(count)?]),
            Self::Range { offset, count } => Ok(vec![bound(offset)?, bound(count)?]),
        }
    }
}

fn bound(n: u64) -> Result<Value> {
    i64::try_from(n)
        .map(Value::Integer)
        .map_err(|_| OrmError::InvalidLimit(n.to_string()))
}

impl From<u64> for Limit {
    fn from(count: u64) -> Self {
        Self::Count(count)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Self::Range { offset, count }
    }
}

/// Accepts exactly one non-negative integer, or two (offset, count).
impl TryFrom<&[Value]> for Limit {
    type Error = OrmError;

    fn try_from(values: &[Value]) -> Result<Self> {
        let count_of = |value: &Value| match value {
            Value::Integer(n) if *n >= 0 => Ok(*n as u64),
            other => Err(OrmError::InvalidLimit(format!("{:?}", other))),
        };

        match values {
            [count] => Ok(Self::Count(count_of(count)?)),
            [offset, count] => Ok(Self::Range {
                offset: count_of(offset)?,
                count: count_of(count)?,
            }),
            other => Err(OrmError::InvalidLimit(format!("{:?}", other))),
        }
    }
}

impl TryFrom<Value> for Limit {
    type Error = OrmError;

    fn try_from(value: Value) -> Result<Self> {
        Self::try_from(std::slice::from_ref(&value))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LimitArg {
    Typed(Limit),
    Raw(Vec<Value>),
}

/// Predicate, ordering and limit for [`crate::Model::find_all`].
///
/// `where` and `order by` are SQL fragments written by the caller; values
/// belong in `args` behind `?` placeholders, never spliced into the fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    where_clause: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<LimitArg>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.where_clause = Some(predicate.into());
        self
    }

    pub fn args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn order_by(mut self, ordering: impl Into<String>) -> Self {
        self.order_by = Some(ordering.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(LimitArg::Typed(limit.into()));
        self
    }

    /// Limit taken from untyped input, validated when the query is built.
    pub fn raw_limit<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.limit = Some(LimitArg::Raw(values.into_iter().map(Into::into).collect()));
        self
    }

    fn resolved_limit(&self) -> Result<Option<Limit>> {
        match &self.limit {
            None => Ok(None),
            Some(LimitArg::Typed(limit)) => Ok(Some(*limit)),
            Some(LimitArg::Raw(values)) => Limit::try_from(values.as_slice()).map(Some),
        }
    }
}

/// Builds the `find_all` statement and its arguments; limit values follow the
/// caller's arguments in template order.
pub fn build_select(meta: &TableMeta, options: &FindOptions) -> Result<(String, Vec<Value>)> {
    let limit = options.resolved_limit()?;

    let mut sql = vec![meta.select_sql().to_string()];
    let mut args = options.args.clone();

    if let Some(predicate) = options.where_clause.as_deref().filter(|w| !w.trim().is_empty()) {
        sql.push("where".to_string());
        sql.push(predicate.to_string());
    }
    if let Some(ordering) = options.order_by.as_deref().filter(|o| !o.trim().is_empty()) {
        sql.push("order by".to_string());
        sql.push(ordering.to_string());
    }
    if let Some(limit) = limit {
        sql.push(limit.clause().to_string());
        args.extend(limit.args()?);
    }

    Ok((sql.join(" "), args))
}

/// Select-by-primary-key statement.
pub fn build_find(meta: &TableMeta) -> String {
    format!(
        "{} where {} = ?",
        meta.select_sql(),
        quote(meta.primary_key_column())
    )
}

/// Aggregate statement whose single result column is named `_num_`.
pub fn build_number(meta: &TableMeta, selected: &str, where_clause: Option<&str>) -> String {
    let mut sql = format!("select {} `_num_` from {}", selected, quote(meta.table_name()));
    if let Some(predicate) = where_clause.filter(|w| !w.trim().is_empty()) {
        sql.push_str(" where ");
        sql.push_str(predicate);
    }
    sql
}
