#![allow(dead_code)]

use std::{sync::Arc, time::Duration};
use switchboard::{
    Catalog, Event, Settings, Switchboard, UserLevel,
    testing::{MockServer, ScriptedModule, StaticAccounts},
};

// ============================================================================
// Fixtures
// ============================================================================

pub const WAIT: Duration = Duration::from_secs(5);

pub const ADMIN: &str = "root";
pub const REGULAR: &str = "alice";

/// Accounts for an admin and a registered user; everyone else is anonymous.
pub fn accounts() -> Arc<StaticAccounts> {
    Arc::new(
        StaticAccounts::new()
            .with(ADMIN, "root", UserLevel::ADMIN)
            .with(REGULAR, "alice", UserLevel::REGISTERED),
    )
}

/// A catalog with one identifier per module, named after the module.
pub fn catalog(modules: Vec<ScriptedModule>) -> Catalog {
    let mut catalog = Catalog::new();
    for module in modules {
        let name = switchboard::Module::name(&module).to_string();
        catalog.register_module(name, move || module.clone());
    }
    catalog
}

/// An engine over `modules` plus the built-ins, everything loaded.
pub fn engine(modules: Vec<ScriptedModule>) -> Switchboard {
    engine_with(modules, Settings::default())
}

pub fn engine_with(modules: Vec<ScriptedModule>, settings: Settings) -> Switchboard {
    let bot = Switchboard::builder()
        .catalog(catalog(modules))
        .settings(settings)
        .accounts(accounts())
        .build();
    let report = bot.load_init();
    assert!(report.failed.is_empty(), "load failures: {:?}", report.failed);
    bot
}

/// Wait until the server has sent at least `count` messages to `target`.
pub async fn replies(server: &MockServer, target: &str, count: usize) -> Vec<String> {
    for _ in 0..200 {
        let messages = server.messages_to(target);
        if messages.len() >= count {
            return messages;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    server.messages_to(target)
}

pub fn with_text(mut event: Event, text: &str) -> Event {
    event.arguments = vec![text.to_string()];
    event
}
