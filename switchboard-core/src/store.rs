//! Per-module persisted key/value store (external collaborator).

use serde_json::Value;
use std::sync::Arc;

/// Key/value store owned by one module.
pub trait Store: Send + Sync + 'static {
    /// Read a key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a key.
    fn set(&self, key: &str, value: Value);

    /// Remove a key, returning its previous value.
    fn remove(&self, key: &str) -> Option<Value>;

    /// Replace a key with `f` applied to its current value, as one step with
    /// respect to every other write. `None` in and out means absent.
    fn update(&self, key: &str, f: &mut dyn FnMut(Option<Value>) -> Option<Value>);

    /// Whether a key is present.
    fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Opens the store belonging to a module name.
pub trait StoreProvider: Send + Sync + 'static {
    /// Store handle for `module`. Repeated calls for the same name must see
    /// the same data.
    fn open(&self, module: &str) -> Arc<dyn Store>;
}
