use super::meta::TableMeta;
use crate::core::Result;
use crate::model::Model;
use lazy_static::lazy_static;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

// Process-wide table metadata, one entry per model type
lazy_static! {
    static ref REGISTRY: RwLock<HashMap<TypeId, Arc<TableMeta>>> = RwLock::new(HashMap::new());
}

/// Returns the metadata of `M`, deriving it on first use.
///
/// Call this once at startup for every model to surface schema errors early.
/// A declaration that fails validation is never stored, so every later use of
/// the type fails with the same error.
pub fn register<M: Model>() -> Result<Arc<TableMeta>> {
    let key = TypeId::of::<M>();
    if let Some(meta) = REGISTRY.read()?.get(&key) {
        return Ok(Arc::clone(meta));
    }

    let meta = Arc::new(TableMeta::build(M::declare())?);

    // Another task may have registered the same type meanwhile; keep the first.
    let mut registry = REGISTRY.write()?;
    Ok(Arc::clone(registry.entry(key).or_insert(meta)))
}

pub fn lookup<M: Model>() -> Option<Arc<TableMeta>> {
    REGISTRY
        .read()
        .ok()
        .and_then(|registry| registry.get(&TypeId::of::<M>()).cloned())
}

pub fn is_registered<M: Model>() -> bool {
    lookup::<M>().is_some()
}
