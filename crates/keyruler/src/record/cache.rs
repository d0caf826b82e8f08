//! In-memory cache of resolved field policies, keyed by schema name.
//!
//! Uses `arc-swap` so lookups on the seal/open path never take a lock.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use serde_json::Value;

use super::schema::{resolve_protected_fields, FieldPolicies};
use super::RecordError;

/// Shared, lock-free map of schema name → protected field policies.
#[derive(Clone, Debug)]
pub struct PolicyCache {
    inner: Arc<ArcSwap<HashMap<String, Arc<FieldPolicies>>>>,
}

impl PolicyCache {
    /// Create a new, empty [`PolicyCache`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Number of schemas currently cached.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if no schemas are cached.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Look up the policies for a schema.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnknownSchema`] if `name` is not present.
    pub fn get(&self, name: &str) -> Result<Arc<FieldPolicies>, RecordError> {
        self.inner
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| RecordError::UnknownSchema(name.to_owned()))
    }

    /// Resolve every schema and atomically replace the whole map.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error; the cache is left unchanged.
    pub fn replace_all<I>(&self, schemas: I) -> Result<(), RecordError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let new_map = schemas
            .into_iter()
            .map(|(name, schema)| {
                let policies = resolve_protected_fields(&schema)?;
                Ok((name, Arc::new(policies)))
            })
            .collect::<Result<HashMap<_, _>, RecordError>>()?;
        self.inner.store(Arc::new(new_map));
        Ok(())
    }
}

impl Default for PolicyCache {
    fn default() -> Self {
        Self::new()
    }
}
