//! # switchboard-std
//!
//! The dispatch engine for Switchboard.
//!
//! This crate provides:
//! - **Registry**: [`registry::Registry`] loads and unloads module
//!   identifiers atomically and owns the merged listener index
//! - **Event bus**: [`bus::EventBus`] delivers events to listeners by
//!   priority, direction and type
//! - **Command router**: [`router::CommandRouter`] resolves text and admin
//!   commands with privilege, channel and ignore checks
//! - **Task pool**: [`pool::TaskPool`] runs background handlers with a cap,
//!   a timeout and panic isolation
//! - **Directives**: [`directive`] parses `@key value` metadata into
//!   descriptors
//! - **Built-in modules**: [`builtin`]
//! - **Testing utilities**: [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use switchboard_core;

pub mod admin;
pub mod builtin;
pub mod bus;
pub mod directive;
pub mod pool;
pub mod registry;
pub mod router;
pub mod store;
pub mod testing;
