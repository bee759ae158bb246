//! In-memory store backend.

use parking_lot::RwLock;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use switchboard_core::{Store, StoreProvider};

/// A store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().remove(key)
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(Option<Value>) -> Option<Value>) {
        let mut values = self.values.write();
        if let Some(value) = f(values.remove(key)) {
            values.insert(key.to_string(), value);
        }
    }
}

/// Hands out one [`MemoryStore`] per module name, kept across reloads.
#[derive(Default)]
pub struct MemoryStores {
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStores {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreProvider for MemoryStores {
    fn open(&self, module: &str) -> Arc<dyn Store> {
        if let Some(store) = self.stores.read().get(module) {
            return store.clone();
        }
        self.stores
            .write()
            .entry(module.to_string())
            .or_default()
            .clone()
    }
}
