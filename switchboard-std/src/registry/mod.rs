//! # Registry
//!
//! Owns every loaded module and the merged views the bus and router read:
//! the listener index, each module's command tables and the global admin
//! table.
//!
//! Loading an identifier is atomic. All of its modules are instantiated and
//! resolved before anything is committed, duplicates are checked under the
//! write lock, and only then do the lifecycle hooks run. Unloading removes
//! exactly what loading added.
//!
//! The listener index sits behind an [`Arc`] and is replaced copy-on-write,
//! so a dispatch in progress keeps working from the snapshot it started with.

mod admin_table;
mod catalog;
mod index;

pub use admin_table::{GlobalAdminEntry, GlobalAdminTable};
pub use catalog::{Catalog, ModuleFactory};
pub use index::{IndexedListener, ListenerIndex};

use crate::{admin::StandardAdminCommands, store::MemoryStores};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    sync::Arc,
};
use switchboard_core::{
    AdminCommand, CommandTable, ListenerSpec, LoadError, Module, ModuleContext, Registrar,
    ResolveError, Settings, Store, StoreProvider,
};
use tracing::{debug, info, warn};

/// A module as the registry holds it.
#[derive(Clone)]
pub struct LoadedModule {
    name: String,
    identifier: String,
    module: Arc<dyn Module>,
    store: Arc<dyn Store>,
    static_commands: Arc<CommandTable>,
    commands: Arc<CommandTable>,
    admin_commands: Arc<BTreeMap<String, AdminCommand>>,
    listeners: Arc<Vec<ListenerSpec>>,
}

impl LoadedModule {
    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier the module was loaded under.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The module instance.
    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    /// The module's store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Text commands, static ones merged over dynamic ones.
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Text commands declared at registration.
    pub fn static_commands(&self) -> &CommandTable {
        &self.static_commands
    }

    /// Admin commands scoped to this module.
    pub fn admin_commands(&self) -> &BTreeMap<String, AdminCommand> {
        &self.admin_commands
    }

    /// Listener bindings this module contributed.
    pub fn listeners(&self) -> &[ListenerSpec] {
        &self.listeners
    }

    fn context(&self, settings: &Arc<Settings>) -> ModuleContext {
        ModuleContext {
            name: self.name.clone(),
            store: self.store.clone(),
            settings: settings.clone(),
        }
    }
}

impl fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("admin_commands", &self.admin_commands.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// What help-style consumers need to know about a loaded module.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Module name.
    pub name: String,
    /// Short tag.
    pub ext: String,
    /// Whether the module is core.
    pub is_core: bool,
    /// Identifier the module was loaded under.
    pub identifier: String,
    /// Merged text commands.
    pub commands: CommandTable,
    /// Module-scoped admin command names.
    pub admin_commands: Vec<String>,
}

/// Outcome of [`Registry::load_init`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Names of modules left loaded.
    pub loaded: Vec<String>,
    /// The subset of `loaded` that are core modules.
    pub core: Vec<String>,
    /// Identifiers or module names skipped because they are disabled.
    pub skipped: Vec<String>,
    /// Identifiers that failed, with the reason.
    pub failed: Vec<(String, LoadError)>,
}

struct Prepared {
    loaded: LoadedModule,
    global_admin: BTreeMap<String, AdminCommand>,
}

#[derive(Default)]
struct RegistryState {
    modules: BTreeMap<String, LoadedModule>,
    identifiers: BTreeMap<String, Vec<String>>,
    listeners: Arc<ListenerIndex>,
    global_admin: GlobalAdminTable,
}

impl RegistryState {
    fn commit(&mut self, identifier: &str, prepared: Vec<Prepared>) {
        let index = Arc::make_mut(&mut self.listeners);
        let mut names = Vec::with_capacity(prepared.len());
        for Prepared {
            loaded,
            global_admin,
        } in prepared
        {
            for spec in loaded.listeners.iter() {
                index.insert(spec);
            }
            for (command_name, command) in global_admin {
                self.global_admin.insert(&command_name, &loaded.name, command);
            }
            names.push(loaded.name.clone());
            self.modules.insert(loaded.name.clone(), loaded);
        }
        self.identifiers.insert(identifier.to_string(), names);
    }

    fn detach(&mut self, identifier: &str) -> Option<Vec<LoadedModule>> {
        let names = self.identifiers.remove(identifier)?;
        let index = Arc::make_mut(&mut self.listeners);
        let mut removed = Vec::with_capacity(names.len());
        for name in names {
            let Some(loaded) = self.modules.remove(&name) else {
                continue;
            };
            for spec in loaded.listeners.iter() {
                index.remove(spec);
            }
            self.global_admin.remove_owner(&name);
            removed.push(loaded);
        }
        Some(removed)
    }
}

/// The module registry.
pub struct Registry {
    state: RwLock<RegistryState>,
    catalog: RwLock<Catalog>,
    standard_admin: StandardAdminCommands,
    stores: Arc<dyn StoreProvider>,
    settings: Arc<Settings>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Dispatch settings.
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Add identifiers to the catalog after construction.
    pub fn extend_catalog(&self, f: impl FnOnce(&mut Catalog)) {
        f(&mut self.catalog.write());
    }

    /// Load every module of `identifier`. Returns the loaded module names.
    pub fn load(&self, identifier: &str) -> Result<Vec<String>, LoadError> {
        match self.try_load(identifier) {
            Ok(names) => {
                info!(identifier, modules = ?names, "Loaded modules");
                Ok(names)
            }
            Err(err) => {
                warn!(identifier, code = err.code(), error = %err, "Failed to load modules");
                Err(err)
            }
        }
    }

    fn try_load(&self, identifier: &str) -> Result<Vec<String>, LoadError> {
        if self.state.read().identifiers.contains_key(identifier) {
            return Err(LoadError::AlreadyLoaded(identifier.to_string()));
        }
        let modules = self
            .catalog
            .read()
            .instantiate(identifier)
            .ok_or_else(|| LoadError::UnknownIdentifier(identifier.to_string()))?;
        if modules.is_empty() {
            return Err(LoadError::NoModules(identifier.to_string()));
        }

        let prepared = modules
            .into_iter()
            .map(|module| self.prepare(identifier, module))
            .collect::<Result<Vec<_>, _>>()?;
        let names: Vec<String> = prepared.iter().map(|p| p.loaded.name.clone()).collect();

        {
            let mut state = self.state.write();
            if state.identifiers.contains_key(identifier) {
                return Err(LoadError::AlreadyLoaded(identifier.to_string()));
            }
            let mut seen = HashSet::new();
            for name in &names {
                if state.modules.contains_key(name) || !seen.insert(name.as_str()) {
                    return Err(LoadError::DuplicateModule {
                        module: name.clone(),
                    });
                }
            }
            let mut batch = ListenerIndex::default();
            for entry in &prepared {
                for spec in entry.loaded.listeners.iter() {
                    if state.listeners.contains(spec) || !batch.insert(spec) {
                        return Err(LoadError::DuplicateListener {
                            module: entry.loaded.name.clone(),
                            key: spec.key().to_string(),
                        });
                    }
                }
            }
            state.commit(identifier, prepared);
        }

        for (position, name) in names.iter().enumerate() {
            let Some(loaded) = self.module(name) else {
                continue;
            };
            if let Err(source) = loaded.module.load(&loaded.context(&self.settings)) {
                let removed = self.state.write().detach(identifier).unwrap_or_default();
                for module in removed.iter().filter(|m| names[..position].contains(&m.name)) {
                    module.module.unload();
                }
                return Err(LoadError::ModuleInit {
                    module: name.clone(),
                    source,
                });
            }
            if let Err(err) = self.reload_dynamic(name) {
                warn!(module = %name, error = %err, "Failed to load dynamic commands");
            }
        }

        Ok(names)
    }

    fn prepare(&self, identifier: &str, module: Arc<dyn Module>) -> Result<Prepared, LoadError> {
        let name = module.name().to_string();
        let resolve = |source: ResolveError| LoadError::Resolve {
            module: name.clone(),
            source,
        };

        let mut registrar = Registrar::new();
        module.clone().register(&mut registrar).map_err(resolve)?;
        for command_name in module.standard_admin_commands() {
            let command = self.standard_admin.build(command_name).ok_or_else(|| {
                LoadError::UnknownStandardAdminCommand {
                    module: name.clone(),
                    command: command_name.to_string(),
                }
            })?;
            registrar.admin_command(command).map_err(resolve)?;
        }
        let declarations = registrar.finish();
        debug!(
            module = %name,
            commands = declarations.commands.len(),
            admin_commands = declarations.admin_commands.len(),
            global_admin_commands = declarations.global_admin_commands.len(),
            listeners = declarations.listeners.len(),
            "Resolved module declarations"
        );

        let store = self.stores.open(&name);
        let static_commands = Arc::new(declarations.commands);
        Ok(Prepared {
            loaded: LoadedModule {
                name,
                identifier: identifier.to_string(),
                module,
                store,
                commands: static_commands.clone(),
                static_commands,
                admin_commands: Arc::new(declarations.admin_commands),
                listeners: Arc::new(declarations.listeners),
            },
            global_admin: declarations.global_admin_commands,
        })
    }

    /// Unload every module of `identifier`. Returns the unloaded module names.
    pub fn unload(&self, identifier: &str) -> Result<Vec<String>, LoadError> {
        let removed = self
            .state
            .write()
            .detach(identifier)
            .ok_or_else(|| LoadError::NotLoaded(identifier.to_string()))?;
        let names: Vec<String> = removed.iter().map(|m| m.name.clone()).collect();
        for loaded in removed {
            loaded.module.unload();
        }
        info!(identifier, modules = ?names, "Unloaded modules");
        Ok(names)
    }

    /// Unload then load `identifier` with fresh module instances.
    pub fn reload(&self, identifier: &str) -> Result<Vec<String>, LoadError> {
        self.unload(identifier)?;
        self.load(identifier)
    }

    /// Load every catalog identifier that is not loaded yet, skipping
    /// disabled identifiers and modules.
    pub fn load_init(&self) -> LoadReport {
        let mut report = LoadReport::default();
        for identifier in self.available() {
            if self.settings.is_module_disabled(&identifier) {
                report.skipped.push(identifier);
                continue;
            }
            match self.load(&identifier) {
                Ok(names) if names.iter().any(|n| self.settings.is_module_disabled(n)) => {
                    if let Err(err) = self.unload(&identifier) {
                        warn!(identifier = %identifier, error = %err, "Failed to unload disabled modules");
                    }
                    report.skipped.extend(names);
                }
                Ok(names) => {
                    for name in &names {
                        if self.module(name).is_some_and(|m| m.module.is_core()) {
                            report.core.push(name.clone());
                        }
                    }
                    report.loaded.extend(names);
                }
                Err(err) => report.failed.push((identifier, err)),
            }
        }
        info!(
            loaded = report.loaded.len(),
            core = ?report.core,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Initial module load finished"
        );
        report
    }

    /// Refetch `module`'s dynamic commands and merge them under its static
    /// ones. Returns how many dynamic names survived the merge.
    pub fn reload_dynamic(&self, module: &str) -> Result<usize, LoadError> {
        let loaded = self
            .module(module)
            .ok_or_else(|| LoadError::UnknownModule(module.to_string()))?;
        let dynamic = loaded
            .module
            .dynamic_commands(&loaded.context(&self.settings))
            .map_err(|source| LoadError::Dynamic {
                module: module.to_string(),
                source,
            })?;

        let mut merged = CommandTable::new();
        for command in dynamic {
            if self.settings.is_dynamic_command_disabled(module, &command.name) {
                debug!(module, command = %command.name, "Skipping disabled dynamic command");
                continue;
            }
            let name = command.name.clone();
            match command.into_table() {
                Ok(table) => merged.extend(table),
                Err(err) => warn!(module, command = %name, error = %err, "Invalid dynamic command"),
            }
        }
        merged.extend(
            loaded
                .static_commands
                .iter()
                .map(|(name, command)| (name.clone(), command.clone())),
        );
        let count = merged.len() - loaded.static_commands.len();

        let mut state = self.state.write();
        match state.modules.get_mut(module) {
            Some(current) if Arc::ptr_eq(&current.module, &loaded.module) => {
                current.commands = Arc::new(merged);
                debug!(module, dynamic = count, "Merged dynamic commands");
                Ok(count)
            }
            _ => Err(LoadError::UnknownModule(module.to_string())),
        }
    }

    /// Names of loaded modules, sorted.
    pub fn module_names(&self) -> Vec<String> {
        self.state.read().modules.keys().cloned().collect()
    }

    /// Loaded identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        self.state.read().identifiers.keys().cloned().collect()
    }

    /// Catalog identifiers that are not loaded, sorted.
    pub fn available(&self) -> Vec<String> {
        let state = self.state.read();
        self.catalog
            .read()
            .identifiers()
            .into_iter()
            .filter(|id| !state.identifiers.contains_key(id))
            .collect()
    }

    /// Whether `identifier` is loaded.
    pub fn is_loaded(&self, identifier: &str) -> bool {
        self.state.read().identifiers.contains_key(identifier)
    }

    /// A loaded module by exact name.
    pub fn module(&self, name: &str) -> Option<LoadedModule> {
        self.state.read().modules.get(name).cloned()
    }

    /// Summary of a loaded module by exact name.
    pub fn module_info(&self, name: &str) -> Option<ModuleInfo> {
        let loaded = self.module(name)?;
        Some(ModuleInfo {
            ext: loaded.module.ext(),
            is_core: loaded.module.is_core(),
            identifier: loaded.identifier.clone(),
            commands: (*loaded.commands).clone(),
            admin_commands: loaded.admin_commands.keys().cloned().collect(),
            name: loaded.name,
        })
    }

    /// A loaded module by case-insensitive name.
    pub fn find_module(&self, name: &str) -> Option<LoadedModule> {
        self.state
            .read()
            .modules
            .values()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Every loaded module in name order.
    pub fn modules(&self) -> Vec<LoadedModule> {
        self.state.read().modules.values().cloned().collect()
    }

    /// Snapshot of the merged listener index.
    pub fn listener_index(&self) -> Arc<ListenerIndex> {
        self.state.read().listeners.clone()
    }

    /// Global admin commands registered under `name`.
    pub fn global_admin(&self, name: &str) -> Vec<GlobalAdminEntry> {
        self.state.read().global_admin.get(name).to_vec()
    }

    /// Global admin command name → owning module names.
    pub fn global_admin_table(&self) -> BTreeMap<String, Vec<String>> {
        self.state.read().global_admin.owners()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Registry")
            .field("identifiers", &state.identifiers)
            .field("listeners", &state.listeners.len())
            .field("catalog", &*self.catalog.read())
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Registry`].
pub struct RegistryBuilder {
    catalog: Catalog,
    stores: Option<Arc<dyn StoreProvider>>,
    settings: Arc<Settings>,
    standard_admin: StandardAdminCommands,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Create a builder with an empty catalog, in-memory stores and default
    /// settings.
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            stores: None,
            settings: Arc::new(Settings::default()),
            standard_admin: StandardAdminCommands::default(),
        }
    }

    /// Set the catalog of loadable identifiers.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the store backend.
    pub fn stores(mut self, stores: Arc<dyn StoreProvider>) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Set the dispatch settings.
    pub fn settings(mut self, settings: impl Into<Arc<Settings>>) -> Self {
        self.settings = settings.into();
        self
    }

    /// Replace the shared admin command table.
    pub fn standard_admin_commands(mut self, table: StandardAdminCommands) -> Self {
        self.standard_admin = table;
        self
    }

    /// Build the registry.
    pub fn build(self) -> Arc<Registry> {
        Arc::new(Registry {
            state: RwLock::new(RegistryState::default()),
            catalog: RwLock::new(self.catalog),
            standard_admin: self.standard_admin,
            stores: self
                .stores
                .unwrap_or_else(|| Arc::new(MemoryStores::new())),
            settings: self.settings,
        })
    }
}
