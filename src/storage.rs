//! Credential persistence.
//!
//! The host's key-value storage (e.g. `localStorage`) is a given capability,
//! expressed as [`KeyValueStore`]. [`TokenStore`] pins it to the single key
//! the credential lives under.
//!
//! Storage is shared between tabs of the same origin without locking. A
//! logout in one tab racing a read in another is not resolved here.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Primitive get/set/remove over string keys.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// The stored credential.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current credential; an empty string counts as absent.
    pub fn read(&self) -> Option<String> {
        self.store.get(&self.key).filter(|token| !token.is_empty())
    }

    pub fn write(&self, token: &str) {
        self.store.set(&self.key, token);
    }

    pub fn clear(&self) {
        self.store.remove(&self.key);
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
