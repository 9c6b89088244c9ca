//! In-memory storage
//!
//! HashMap-based storage with RwLock for concurrency.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::Storage;

/// In-memory key-value map
///
/// ## Concurrency:
/// - `data`: Protected by RwLock (many concurrent readers, exclusive writer)
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new empty storage
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    fn set(&self, key: String, value: String) {
        self.data.write().insert(key, value);
    }

    fn delete(&self, key: &str) {
        self.data.write().remove(key);
    }
}
