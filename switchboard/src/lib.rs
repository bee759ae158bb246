//! # switchboard - Module and Command Dispatch for Chat Bots
//!
//! `switchboard` routes chat-protocol events to pluggable modules. Modules
//! declare commands, admin commands and event listeners; the registry merges
//! them, the event bus delivers events by priority, and the command router
//! turns chat messages into command invocations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchboard::prelude::*;
//!
//! struct Dice;
//!
//! impl Module for Dice {
//!     fn name(&self) -> &str { "dice" }
//!
//!     fn register(self: Arc<Self>, registrar: &mut Registrar) -> Result<(), ResolveError> {
//!         let roll = CommandHandler::new(|ctx| async move {
//!             ctx.reply("4");
//!             Ok(())
//!         });
//!         registrar.command(Command::new("roll", roll).alias("r"))?;
//!         Ok(())
//!     }
//! }
//!
//! let bot = Switchboard::builder()
//!     .catalog(Catalog::new().with_module("dice", || Dice))
//!     .build();
//! bot.load_init();
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod engine;
pub mod telemetry;

pub use engine::{Switchboard, SwitchboardBuilder};

pub use switchboard_core::{
    // Collaborators
    Accounts,
    // Descriptors
    AdminCommand,
    // Error types
    BoxError,
    Command,
    CommandContext,
    CommandFuture,
    // Handlers
    CommandHandler,
    CommandTable,
    ConfigError,
    DEFAULT_CHANNEL_MODE,
    DESCRIPTION_SEPARATOR,
    Declarations,
    // Events
    Direction,
    Event,
    EventSelector,
    HandlerId,
    Invocation,
    ListenDirection,
    ListenerFuture,
    ListenerHandler,
    ListenerKey,
    ListenerSpec,
    LoadError,
    // Modules
    Module,
    ModuleContext,
    NoAccounts,
    PRIVMSG,
    PUBMSG,
    Priority,
    Registrar,
    ResolveError,
    Server,
    // Configuration
    Settings,
    Store,
    StoreProvider,
    SwitchboardError,
    Target,
    TaskSettings,
    UserLevel,
    mode_rank,
};

pub use switchboard_std::{
    admin::{IGNORED_KEY, StandardAdminCommands},
    builtin::{LogModule, ModulesModule},
    bus::EventBus,
    directive::{RegistrarExt, parse_listen, resolve_command, resolve_listeners},
    pool::TaskPool,
    registry::{
        Catalog, GlobalAdminEntry, IndexedListener, ListenerIndex, LoadReport, LoadedModule,
        ModuleInfo, Registry, RegistryBuilder,
    },
    router::{CommandRouter, WILDCARD},
    store::{MemoryStore, MemoryStores},
};

/// Testing utilities.
pub mod testing {
    pub use switchboard_std::testing::{
        MockServer, Recorder, ScriptedModule, Sent, StaticAccounts, pubmsg, privmsg,
        recording_command, recording_listener,
    };
}

/// Everything a module author needs.
pub mod prelude {
    pub use crate::{
        Accounts, BoxError, Catalog, Command, CommandContext, CommandHandler, Direction, Event,
        EventSelector, ListenDirection, ListenerHandler, ListenerSpec, Module, ModuleContext,
        Priority, Registrar, RegistrarExt, ResolveError, Server, Settings, Store, Switchboard,
        UserLevel,
    };
    pub use std::sync::Arc;
}
