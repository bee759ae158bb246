//! Loadable identifiers and the factories behind them.

use std::{collections::BTreeMap, fmt, sync::Arc};
use switchboard_core::Module;

/// Builds the modules of one identifier. Called on every load, so a reload
/// gets fresh instances.
pub type ModuleFactory = Arc<dyn Fn() -> Vec<Arc<dyn Module>> + Send + Sync>;

/// Identifier → module factory.
#[derive(Clone, Default)]
pub struct Catalog {
    factories: BTreeMap<String, ModuleFactory>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identifier producing any number of modules.
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Vec<Arc<dyn Module>> + Send + Sync + 'static,
    {
        self.factories.insert(identifier.into(), Arc::new(factory));
        self
    }

    /// Register an identifier producing a single module.
    pub fn register_module<M, F>(&mut self, identifier: impl Into<String>, factory: F) -> &mut Self
    where
        M: Module,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register(identifier, move || vec![Arc::new(factory()) as Arc<dyn Module>])
    }

    /// Builder form of [`Catalog::register_module`].
    pub fn with_module<M, F>(mut self, identifier: impl Into<String>, factory: F) -> Self
    where
        M: Module,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register_module(identifier, factory);
        self
    }

    /// Fresh module instances for `identifier`.
    pub fn instantiate(&self, identifier: &str) -> Option<Vec<Arc<dyn Module>>> {
        self.factories.get(identifier).map(|factory| factory())
    }

    /// Whether `identifier` is known.
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Known identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("identifiers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
