//! Storage Module
//!
//! Key → value string storage used by the compute layer.
//!
//! ## Responsibilities
//! - Point lookups, overwrites and deletes
//! - Safe concurrent access from every connection thread
//!
//! No ordering, eviction or persistence guarantees.

mod memory;

use std::sync::Arc;

pub use memory::MemoryStorage;

/// Capability interface for a key-value store
///
/// All methods take `&self`; implementations provide their own
/// synchronization so one instance can be shared across connections.
pub trait Storage: Send + Sync {
    /// Look up a key
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or overwrite a key (last write wins)
    fn set(&self, key: String, value: String);

    /// Remove a key; removing an absent key is a no-op
    fn delete(&self, key: &str);
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: String, value: String) {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) {
        (**self).delete(key)
    }
}
