//! Named-blob storage capability
//!
//! The engine only ever needs get/set/remove of string values by key and a
//! key listing for prefix sweeps. Implementations use interior mutability so
//! one handle can be shared by the fragment store, the PIN gate and the decoy
//! store.

use crate::Result;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Key/value blob store
pub trait Storage: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) a value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored
    fn list_keys(&self) -> Result<Vec<String>>;

    /// Whether `key` is present
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-process storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of every entry, for inspection in tests and tooling
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_basic() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert!(storage.contains("b").unwrap());

        storage.set("a", "3").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("3"));

        storage.remove("a").unwrap();
        storage.remove("missing").unwrap();
        assert_eq!(storage.list_keys().unwrap(), vec!["b".to_string()]);
        assert_eq!(storage.len(), 1);
    }
}
