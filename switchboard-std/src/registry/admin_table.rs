//! Global admin command table.

use std::collections::BTreeMap;
use switchboard_core::AdminCommand;

/// A global admin command and the module that declared it.
#[derive(Debug, Clone)]
pub struct GlobalAdminEntry {
    /// Name of the declaring module.
    pub owner: String,
    /// The command.
    pub command: AdminCommand,
}

/// Admin commands callable without naming a module, keyed by command name.
///
/// Several modules may declare the same global name; all of them run.
#[derive(Debug, Clone, Default)]
pub struct GlobalAdminTable {
    entries: BTreeMap<String, Vec<GlobalAdminEntry>>,
}

impl GlobalAdminTable {
    /// Register `command` under `name` for `owner`.
    pub fn insert(&mut self, name: &str, owner: &str, command: AdminCommand) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .push(GlobalAdminEntry {
                owner: owner.to_string(),
                command,
            });
    }

    /// Drop every entry owned by `owner`, pruning names left empty.
    pub fn remove_owner(&mut self, owner: &str) {
        self.entries.retain(|_, list| {
            list.retain(|entry| entry.owner != owner);
            !list.is_empty()
        });
    }

    /// Entries registered under `name`.
    pub fn get(&self, name: &str) -> &[GlobalAdminEntry] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Command name → owning module names.
    pub fn owners(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(name, list)| {
                let owners = list.iter().map(|entry| entry.owner.clone()).collect();
                (name.clone(), owners)
            })
            .collect()
    }

    /// Whether no global admin commands are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
