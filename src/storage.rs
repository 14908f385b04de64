use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

// 1. SessionStorage Contract
/// SessionStorage
///
/// The ambient key-value store that login and logout flows write the session into
/// (`access_token`, `user_role`, ...). Navigation only reads it, apart from
/// persisting a role the guard changed.
///
/// Values are plain strings; a missing key and an empty value are both "absent"
/// to the credential loader.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str);

    fn remove_item(&self, key: &str);
}

/// SessionStorageState
///
/// Shareable handle for a storage implementation.
pub type SessionStorageState = Arc<dyn SessionStorage>;

// 2. In-Memory Implementation
/// MemorySessionStorage
///
/// A process-local store. Used by tests and by embedders that keep the session in
/// memory; the lock makes it safe to share across tasks.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, e.g. with what a login flow would have written.
    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let items = items
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self {
            items: RwLock::new(items),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
