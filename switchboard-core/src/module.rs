//! # Modules
//!
//! A module is the unit that contributes commands, admin commands and
//! listeners. Instead of discovering handlers by naming convention, each
//! module declares them explicitly through a [`Registrar`] in
//! [`Module::register`].
//!
//! # Lifecycle
//!
//! 1. The registry instantiates the module and calls [`Module::register`].
//! 2. Declarations are merged into the registry.
//! 3. [`Module::load`] runs once; [`Module::dynamic_commands`] is queried.
//! 4. On unload, declarations are removed and [`Module::unload`] runs.

use crate::{
    config::Settings,
    descriptor::{AdminCommand, Command, CommandTable, ListenerSpec},
    error::{BoxError, ResolveError},
    store::Store,
};
use std::{collections::BTreeMap, sync::Arc};

/// Handles a module receives at load time.
#[derive(Clone)]
pub struct ModuleContext {
    /// The module's name.
    pub name: String,
    /// The module's store.
    pub store: Arc<dyn Store>,
    /// Dispatch settings.
    pub settings: Arc<Settings>,
}

/// A loadable unit of bot functionality.
pub trait Module: Send + Sync + 'static {
    /// Unique module name.
    fn name(&self) -> &str;

    /// Short tag; the first three characters of the name by default.
    fn ext(&self) -> String {
        self.name().chars().take(3).collect()
    }

    /// Whether the bot is expected to always run this module.
    fn is_core(&self) -> bool {
        false
    }

    /// Names of shared admin commands this module wants bound to itself.
    fn standard_admin_commands(&self) -> &[&str] {
        &[]
    }

    /// Declare commands, admin commands and listeners.
    fn register(self: Arc<Self>, registrar: &mut Registrar) -> Result<(), ResolveError>;

    /// Called once after registration. May open per-module resources.
    fn load(&self, _ctx: &ModuleContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called on unload; must release what [`Module::load`] opened.
    fn unload(&self) {}

    /// Commands sourced from external data, merged under the static ones.
    fn dynamic_commands(&self, _ctx: &ModuleContext) -> Result<Vec<Command>, BoxError> {
        Ok(Vec::new())
    }
}

/// Collects a module's declarations.
#[derive(Debug, Default)]
pub struct Registrar {
    commands: CommandTable,
    admin_commands: BTreeMap<String, AdminCommand>,
    global_admin_commands: BTreeMap<String, AdminCommand>,
    listeners: Vec<ListenerSpec>,
}

/// Everything a module declared, ready for the registry.
#[derive(Debug, Default)]
pub struct Declarations {
    /// Static text commands, aliases expanded.
    pub commands: CommandTable,
    /// Admin commands scoped to the module.
    pub admin_commands: BTreeMap<String, AdminCommand>,
    /// Admin commands for the global table.
    pub global_admin_commands: BTreeMap<String, AdminCommand>,
    /// Listener bindings, free of duplicates per key.
    pub listeners: Vec<ListenerSpec>,
}

impl Registrar {
    /// Create an empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a text command.
    pub fn command(&mut self, command: Command) -> Result<&mut Self, ResolveError> {
        let table = command.into_table()?;
        Ok(self.command_table(table))
    }

    /// Merge an already materialized command table.
    pub fn command_table(&mut self, table: CommandTable) -> &mut Self {
        self.commands.extend(table);
        self
    }

    /// Declare an admin command; `global` ones go to the global table.
    pub fn admin_command(&mut self, command: Command) -> Result<&mut Self, ResolveError> {
        let table = command.into_table()?;
        Ok(self.admin_command_table(table))
    }

    /// Merge an already materialized admin command table.
    pub fn admin_command_table(&mut self, table: CommandTable) -> &mut Self {
        for (name, command) in table {
            let admin = AdminCommand::new(command);
            if admin.is_global() {
                self.global_admin_commands.insert(name, admin);
            } else {
                self.admin_commands.insert(name, admin);
            }
        }
        self
    }

    /// Declare a listener binding. A binding with the same key, handler and
    /// inline flag as an existing one is ignored.
    pub fn listener(&mut self, spec: ListenerSpec) -> &mut Self {
        let duplicate = self.listeners.iter().any(|existing| {
            existing.key() == spec.key()
                && existing.handler == spec.handler
                && existing.inline == spec.inline
        });
        if !duplicate {
            self.listeners.push(spec);
        }
        self
    }

    /// Declare several listener bindings.
    pub fn listeners(&mut self, specs: impl IntoIterator<Item = ListenerSpec>) -> &mut Self {
        for spec in specs {
            self.listener(spec);
        }
        self
    }

    /// Finish registration.
    pub fn finish(self) -> Declarations {
        Declarations {
            commands: self.commands,
            admin_commands: self.admin_commands,
            global_admin_commands: self.global_admin_commands,
            listeners: self.listeners,
        }
    }
}
