//! Concurrency-safe, compute-once schema cache.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::{Record, SchemaError, TypeSchema};

/// Memoizes one [`TypeSchema`] per record type for the cache's lifetime.
///
/// The cache is an explicit object: share it between consumers with `Arc`
/// and construct a fresh one for isolation. There is no eviction.
///
/// Two callers racing on an unseen type may both compute its schema; the
/// first insertion wins and every later lookup returns that same `Arc`.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: RwLock<HashMap<TypeId, Arc<TypeSchema>>>,
    computations: AtomicUsize,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the schema for `T`, computing it on first use.
    ///
    /// A malformed tag fails the lookup and caches nothing.
    pub fn schema<T: Record>(&self) -> Result<Arc<TypeSchema>, SchemaError> {
        let key = TypeId::of::<T>();

        if let Some(schema) = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(schema));
        }

        self.computations.fetch_add(1, Ordering::Relaxed);
        let computed = Arc::new(TypeSchema::from_decls(type_name::<T>(), T::FIELDS)?);

        let mut schemas = self
            .schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(schemas.entry(key).or_insert(computed)))
    }

    /// Number of schema computations performed so far.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Number of cached types.
    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
