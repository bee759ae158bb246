//! Runtime module management.

use crate::registry::Registry;
use std::sync::{Arc, Weak};
use switchboard_core::{
    BoxError, Command, CommandContext, CommandHandler, Module, Registrar, ResolveError, UserLevel,
};

/// Core module exposing the registry to admins over chat.
///
/// - `module list` names loaded and loadable identifiers
/// - `module load|unload|reload <name...>` manages identifiers
/// - `json reload [name...]` refetches dynamic commands
/// - admin command `list` names loaded modules
#[derive(Debug, Clone)]
pub struct ModulesModule {
    registry: Weak<Registry>,
}

impl ModulesModule {
    /// Create the module over a registry handle.
    pub fn new(registry: Weak<Registry>) -> Self {
        Self { registry }
    }
}

impl Module for ModulesModule {
    fn name(&self) -> &str {
        "modules"
    }

    fn is_core(&self) -> bool {
        true
    }

    fn register(self: Arc<Self>, registrar: &mut Registrar) -> Result<(), ResolveError> {
        registrar
            .command(
                Command::new("module", handler(&self.registry, module_command))
                    .usage("load/unload/reload <name...>")
                    .description("Load, unload or reload the named modules")
                    .usage("list")
                    .description("List loaded modules")
                    .call_level(UserLevel::ADMIN),
            )?
            .command(
                Command::new("json", handler(&self.registry, json_command))
                    .usage("reload [name...]")
                    .description("Reload dynamic commands of every module, or of the named ones")
                    .call_level(UserLevel::ADMIN),
            )?
            .admin_command(
                Command::new("list", handler(&self.registry, list_command))
                    .description("List loaded module names")
                    .call_level(UserLevel::ADMIN),
            )?;
        Ok(())
    }
}

type Action = fn(&Registry, &CommandContext);

fn handler(registry: &Weak<Registry>, action: Action) -> CommandHandler {
    let registry = registry.clone();
    CommandHandler::new(move |ctx| {
        let registry = registry.upgrade();
        async move {
            let registry = registry.ok_or("module registry is gone")?;
            action(&registry, &ctx);
            Ok::<(), BoxError>(())
        }
    })
}

fn module_command(registry: &Registry, ctx: &CommandContext) {
    let mut args = ctx.invocation.args();
    let Some(action) = args.next().map(str::to_lowercase) else {
        return;
    };

    match action.as_str() {
        "list" => {
            ctx.reply(&format!("Loaded modules: {}", registry.identifiers().join(", ")));
            let available = registry.available();
            if !available.is_empty() {
                ctx.reply(&format!(
                    "Additional available modules: {}",
                    available.join(", ")
                ));
            }
        }
        "load" | "unload" | "reload" => {
            let mut succeeded = Vec::new();
            let mut failed = Vec::new();
            for name in args {
                let result = match action.as_str() {
                    "load" => registry.load(name),
                    "unload" => registry.unload(name),
                    _ => registry.reload(name),
                };
                match result {
                    Ok(_) => succeeded.push(name),
                    Err(_) => failed.push(name),
                }
            }
            succeeded.sort_unstable();
            failed.sort_unstable();

            let title = capitalize(&action);
            if !succeeded.is_empty() {
                ctx.reply(&format!("{title}ed: {}", succeeded.join(", ")));
            }
            if !failed.is_empty() {
                ctx.reply(&format!("{title} Failed: {}", failed.join(", ")));
            }
        }
        _ => {}
    }
}

fn json_command(registry: &Registry, ctx: &CommandContext) {
    let mut args = ctx.invocation.args();
    if !args.next().is_some_and(|action| action.eq_ignore_ascii_case("reload")) {
        return;
    }
    let wanted: Vec<String> = args.map(str::to_lowercase).collect();
    if wanted.is_empty() {
        ctx.reply("Reloading dynamic commands of all modules");
    }

    let mut reloaded = Vec::new();
    for name in registry.module_names() {
        if !wanted.is_empty() && !wanted.contains(&name.to_lowercase()) {
            continue;
        }
        match registry.reload_dynamic(&name) {
            Ok(_) => reloaded.push(name),
            Err(err) => tracing::warn!(module = %name, error = %err, "Dynamic command reload failed"),
        }
    }
    ctx.reply(&format!(
        "Reloaded dynamic commands for modules: {}",
        reloaded.join(", ")
    ));
}

fn list_command(registry: &Registry, ctx: &CommandContext) {
    ctx.reply(&format!("Modules: {}", registry.module_names().join(", ")));
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
