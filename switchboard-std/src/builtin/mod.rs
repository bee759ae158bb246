//! Modules shipped with the engine.
//!
//! - [`ModulesModule`]: `module` and `json` text commands for runtime module
//!   management
//! - [`LogModule`]: traces every event at debug level

mod log;
mod modules;

pub use log::LogModule;
pub use modules::ModulesModule;

use crate::registry::Registry;
use std::sync::Arc;

/// Identifier of [`ModulesModule`].
pub const MODULES: &str = "modules";
/// Identifier of [`LogModule`].
pub const LOG: &str = "log";

/// Add the built-in identifiers to `registry`'s catalog.
pub fn install(registry: &Arc<Registry>) {
    let handle = Arc::downgrade(registry);
    registry.extend_catalog(|catalog| {
        catalog
            .register_module(MODULES, move || ModulesModule::new(handle.clone()))
            .register_module(LOG, || LogModule);
    });
}
