//! In-memory local store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cart::storage::{LocalStore, StoreError};

/// A [`LocalStore`] backed by a shared `HashMap`.
///
/// Clones share the same map, so a test can keep one clone to inspect what
/// the cart wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value without going through the async trait.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    /// Write a value without going through the async trait.
    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.values().insert(key.to_owned(), value.into());
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LocalStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.insert(key, value);
        Ok(())
    }
}
