//! Shared admin commands that modules opt into by name.
//!
//! A module lists names in [`Module::standard_admin_commands`]; the registry
//! builds each one from the shared table and binds it to the module's own
//! admin commands. An unknown name fails the load.
//!
//! [`Module::standard_admin_commands`]: switchboard_core::Module::standard_admin_commands

use serde_json::Value;
use std::{collections::BTreeMap, fmt, sync::Arc};
use switchboard_core::{BoxError, Command, CommandContext, CommandHandler, Store, UserLevel};

/// Store key holding the casefolded nicks a module ignores.
pub const IGNORED_KEY: &str = "ignored";

type Factory = Arc<dyn Fn() -> Command + Send + Sync>;

/// Named admin command factories.
#[derive(Clone)]
pub struct StandardAdminCommands {
    factories: BTreeMap<String, Factory>,
}

impl StandardAdminCommands {
    /// A table without any commands.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Add a factory. The command it builds is always admin-level, unbound
    /// and module-scoped, whatever the factory set.
    pub fn insert<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Command + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Build the command registered under `name`.
    pub fn build(&self, name: &str) -> Option<Command> {
        let factory = self.factories.get(name)?;
        let mut command = factory();
        command.name = name.to_string();
        command.call_level = UserLevel::ADMIN;
        command.view_level = None;
        command.bound = false;
        command.global = false;
        Some(command)
    }

    /// Registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for StandardAdminCommands {
    /// The `ignore`, `unignore` and `ignored` commands.
    fn default() -> Self {
        let mut table = Self::empty();
        table
            .insert("ignore", || {
                Command::new("ignore", CommandHandler::new(ignore))
                    .usage("<nick> [nick...]")
                    .description("Ignore text commands from the given nicks")
            })
            .insert("unignore", || {
                Command::new("unignore", CommandHandler::new(unignore))
                    .usage("<nick> [nick...]")
                    .description("Stop ignoring the given nicks")
            })
            .insert("ignored", || {
                Command::new("ignored", CommandHandler::new(list_ignored))
                    .description("List ignored nicks")
            });
        table
    }
}

impl fmt::Debug for StandardAdminCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Casefolded nicks in a module's ignore list.
pub fn ignored_nicks(store: &dyn Store) -> Vec<String> {
    decode(store.get(IGNORED_KEY))
}

fn decode(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Apply `edit` to the ignore list in one store update. An emptied list
/// removes the key.
fn edit_ignored(store: &dyn Store, mut edit: impl FnMut(&mut Vec<String>)) {
    store.update(IGNORED_KEY, &mut |current| {
        let mut nicks = decode(current);
        edit(&mut nicks);
        (!nicks.is_empty()).then(|| Value::Array(nicks.into_iter().map(Value::String).collect()))
    });
}

fn owner_name(ctx: &CommandContext) -> String {
    ctx.module
        .as_ref()
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

async fn ignore(ctx: CommandContext) -> Result<(), BoxError> {
    let server = ctx.event.server.clone();
    let mut added = Vec::new();
    edit_ignored(ctx.store.as_ref(), |nicks| {
        added.clear();
        for nick in ctx.invocation.args() {
            let folded = server.casefold(nick);
            if !nicks.contains(&folded) {
                nicks.push(folded);
                added.push(nick);
            }
        }
    });
    if added.is_empty() {
        ctx.reply("Nobody new to ignore");
        return Ok(());
    }
    ctx.reply(&format!("{}: now ignoring {}", owner_name(&ctx), added.join(", ")));
    Ok(())
}

async fn unignore(ctx: CommandContext) -> Result<(), BoxError> {
    let server = ctx.event.server.clone();
    let mut removed = Vec::new();
    edit_ignored(ctx.store.as_ref(), |nicks| {
        removed.clear();
        for nick in ctx.invocation.args() {
            let folded = server.casefold(nick);
            if let Some(position) = nicks.iter().position(|n| *n == folded) {
                nicks.remove(position);
                removed.push(nick);
            }
        }
    });
    if removed.is_empty() {
        ctx.reply("None of those nicks were ignored");
        return Ok(());
    }
    ctx.reply(&format!(
        "{}: no longer ignoring {}",
        owner_name(&ctx),
        removed.join(", ")
    ));
    Ok(())
}

async fn list_ignored(ctx: CommandContext) -> Result<(), BoxError> {
    let nicks = ignored_nicks(ctx.store.as_ref());
    if nicks.is_empty() {
        ctx.reply(&format!("{}: not ignoring anyone", owner_name(&ctx)));
    } else {
        ctx.reply(&format!("{}: ignoring {}", owner_name(&ctx), nicks.join(", ")));
    }
    Ok(())
}
