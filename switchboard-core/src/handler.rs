//! # Handlers
//!
//! Listener and command handlers are type-erased async closures with a stable
//! identity. Cloning a handler keeps its [`HandlerId`], so every descriptor
//! built from one closure (command aliases, several `listen` bindings) shares
//! the identity the bus and router deduplicate on.

use crate::{
    descriptor::Command, error::BoxError, event::Event, module::Module, store::Store,
};
use futures::future::BoxFuture;
use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an underlying handler implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Future returned by listener handlers. `Some(event)` replaces the event for
/// everything dispatched afterwards; only honored for inline listeners.
pub type ListenerFuture = BoxFuture<'static, Result<Option<Event>, BoxError>>;

/// Future returned by command handlers.
pub type CommandFuture = BoxFuture<'static, Result<(), BoxError>>;

type ListenerFn = dyn Fn(Event) -> ListenerFuture + Send + Sync;
type CommandFn = dyn Fn(CommandContext) -> CommandFuture + Send + Sync;

/// An event listener callback.
#[derive(Clone)]
pub struct ListenerHandler {
    id: HandlerId,
    call: Arc<ListenerFn>,
}

impl ListenerHandler {
    /// Wrap an async closure that may return a replacement event.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Event>, BoxError>> + Send + 'static,
    {
        Self {
            id: HandlerId::next(),
            call: Arc::new(move |event| Box::pin(f(event))),
        }
    }

    /// Wrap an async closure that only observes events.
    pub fn observe<F, Fut>(f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::new(move |event| {
            let fut = f(event);
            async move {
                fut.await;
                Ok(None)
            }
        })
    }

    /// Identity shared by all clones.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Invoke the handler.
    pub fn call(&self, event: Event) -> ListenerFuture {
        (self.call)(event)
    }
}

impl PartialEq for ListenerHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ListenerHandler {}

impl fmt::Debug for ListenerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListenerHandler").field(&self.id).finish()
    }
}

/// A command or admin-command callback.
#[derive(Clone)]
pub struct CommandHandler {
    id: HandlerId,
    call: Arc<CommandFn>,
}

impl CommandHandler {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            id: HandlerId::next(),
            call: Arc::new(move |ctx| Box::pin(f(ctx))),
        }
    }

    /// Identity shared by all clones.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Invoke the handler.
    pub fn call(&self, ctx: CommandContext) -> CommandFuture {
        (self.call)(ctx)
    }
}

impl PartialEq for CommandHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandHandler {}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandHandler").field(&self.id).finish()
    }
}

/// What the user typed: the command word and everything after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Command name as invoked, lower-cased.
    pub command: String,
    /// Argument remainder, possibly empty.
    pub arguments: String,
}

impl Invocation {
    /// Create an invocation.
    pub fn new(command: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: arguments.into(),
        }
    }

    /// Whitespace-separated arguments.
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.arguments.split_whitespace()
    }
}

/// Everything a command handler is called with.
#[derive(Clone)]
pub struct CommandContext {
    /// The triggering chat message.
    pub event: Event,
    /// The matched descriptor.
    pub command: Arc<Command>,
    /// The parsed invocation.
    pub invocation: Invocation,
    /// The owning module, passed only to commands declared `bound = false`.
    pub module: Option<Arc<dyn Module>>,
    /// The owning module's store.
    pub store: Arc<dyn Store>,
}

impl CommandContext {
    /// Reply where the command was invoked.
    pub fn reply(&self, text: &str) {
        self.event.reply(text);
    }

    /// Send a notice to the invoking user.
    pub fn notice(&self, text: &str) {
        self.event.server.notice(self.event.source_nick(), text);
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("event", &self.event)
            .field("command", &self.command.name)
            .field("invocation", &self.invocation)
            .field("module", &self.module.as_ref().map(|m| m.name().to_string()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity() {
        let a = ListenerHandler::observe(|_event| async {});
        let b = a.clone();
        let c = ListenerHandler::observe(|_event| async {});
        assert_eq!(a, b);
        assert_ne!(a, c);

        let cmd = CommandHandler::new(|_ctx| async { Ok(()) });
        assert_eq!(cmd.id(), cmd.clone().id());
    }

    #[test]
    fn invocation_splits_arguments() {
        let inv = Invocation::new("module", "load  dice  log");
        assert_eq!(inv.args().collect::<Vec<_>>(), ["load", "dice", "log"]);
    }
}
