//! A registry and event bus wired together.

use std::sync::Arc;
use switchboard_core::{Accounts, Event, NoAccounts, Settings, StoreProvider};
use switchboard_std::{
    admin::StandardAdminCommands,
    builtin,
    bus::EventBus,
    registry::{Catalog, LoadReport, Registry},
};

/// The dispatch engine a transport feeds events into.
///
/// # Example
///
/// ```rust,ignore
/// let bot = Switchboard::builder()
///     .settings(Settings::load("bot.toml")?)
///     .catalog(catalog)
///     .build();
/// bot.load_init();
/// let event = bot.dispatch(event).await;
/// ```
#[derive(Debug)]
pub struct Switchboard {
    registry: Arc<Registry>,
    bus: EventBus,
}

impl Switchboard {
    /// Start building an engine.
    pub fn builder() -> SwitchboardBuilder {
        SwitchboardBuilder::new()
    }

    /// The module registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Load every available identifier that is not disabled.
    pub fn load_init(&self) -> LoadReport {
        self.registry.load_init()
    }

    /// Dispatch an event; see [`EventBus::dispatch`].
    pub async fn dispatch(&self, event: Event) -> Event {
        self.bus.dispatch(event).await
    }
}

/// Builder for [`Switchboard`].
pub struct SwitchboardBuilder {
    catalog: Catalog,
    settings: Settings,
    accounts: Arc<dyn Accounts>,
    stores: Option<Arc<dyn StoreProvider>>,
    standard_admin: StandardAdminCommands,
    builtins: bool,
}

impl Default for SwitchboardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchboardBuilder {
    /// Defaults: empty catalog plus the built-in modules, default settings,
    /// no accounts and in-memory stores.
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            settings: Settings::default(),
            accounts: Arc::new(NoAccounts),
            stores: None,
            standard_admin: StandardAdminCommands::default(),
            builtins: true,
        }
    }

    /// Set the catalog of loadable identifiers.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the dispatch settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the account backend.
    pub fn accounts(mut self, accounts: Arc<dyn Accounts>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Set the store backend.
    pub fn stores(mut self, stores: Arc<dyn StoreProvider>) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Replace the shared admin command table.
    pub fn standard_admin_commands(mut self, table: StandardAdminCommands) -> Self {
        self.standard_admin = table;
        self
    }

    /// Leave the built-in `modules` and `log` identifiers out of the catalog.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Build the engine. Nothing is loaded yet.
    pub fn build(self) -> Switchboard {
        let mut registry = Registry::builder()
            .catalog(self.catalog)
            .settings(self.settings)
            .standard_admin_commands(self.standard_admin);
        if let Some(stores) = self.stores {
            registry = registry.stores(stores);
        }
        let registry = registry.build();
        if self.builtins {
            builtin::install(&registry);
        }
        let bus = EventBus::new(registry.clone(), self.accounts);
        Switchboard { registry, bus }
    }
}
