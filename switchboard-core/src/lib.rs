//! # switchboard-core
//!
//! Core types and traits for the Switchboard dispatch engine.
//!
//! This crate has minimal dependencies and is what modules depend on: it
//! defines what a module declares and what the engine hands back to it,
//! without any of the dispatch machinery.
//!
//! # Layers
//!
//! ## Descriptors ([`Command`], [`AdminCommand`], [`ListenerSpec`])
//!
//! Strongly-typed declarations. A command carries its names, help text,
//! privilege levels and channel scoping; a listener binding carries its
//! priority, direction, event type and inline flag.
//!
//! ## Handlers ([`ListenerHandler`], [`CommandHandler`])
//!
//! Type-erased async callbacks with a stable [`HandlerId`] used for
//! deduplication across aliases and bindings.
//!
//! ## Modules ([`Module`], [`Registrar`])
//!
//! The capability interface every module implements.
//!
//! ## Collaborators ([`Server`], [`Accounts`], [`Store`])
//!
//! The transport, account and persistence boundaries.
//!
//! # Error Types
//!
//! - [`SwitchboardError`] - Top-level error type
//! - [`ResolveError`] - Descriptor resolution errors
//! - [`LoadError`] - Registry load/unload errors
//! - [`ConfigError`] - Settings errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod accounts;
mod config;
mod descriptor;
mod error;
mod event;
mod handler;
mod level;
mod module;
mod store;

pub use accounts::{Accounts, NoAccounts};
pub use config::{Settings, TaskSettings};
pub use descriptor::{
    AdminCommand, Command, CommandTable, DEFAULT_CHANNEL_MODE, DESCRIPTION_SEPARATOR,
    EventSelector, ListenDirection, ListenerKey, ListenerSpec,
};
pub use error::{BoxError, ConfigError, LoadError, ResolveError, SwitchboardError};
pub use event::{Direction, Event, PRIVMSG, PUBMSG, Server, Target, mode_rank};
pub use handler::{
    CommandContext, CommandFuture, CommandHandler, HandlerId, Invocation, ListenerFuture,
    ListenerHandler,
};
pub use level::{Priority, UserLevel};
pub use module::{Declarations, Module, ModuleContext, Registrar};
pub use store::{Store, StoreProvider};
