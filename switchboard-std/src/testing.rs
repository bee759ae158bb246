//! Testing utilities for Switchboard.
//!
//! # Features
//!
//! - [`MockServer`]: A transport stand-in with channels, prefix modes and a
//!   log of everything sent
//! - [`StaticAccounts`]: Fixed nick → account → level mapping
//! - [`Recorder`]: Collects values from background handlers and lets a test
//!   wait for them
//! - [`ScriptedModule`]: A module assembled from descriptors at runtime
//! - [`pubmsg`], [`privmsg`]: Inbound chat message constructors

use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use switchboard_core::{
    Accounts, Command, CommandContext, CommandHandler, Direction, Event, ListenerHandler,
    ListenerSpec, Module, PRIVMSG, PUBMSG, Registrar, ResolveError, Server, UserLevel,
};
use tokio::{sync::Notify, time::Instant};

// ============================================================================
// Mock Server
// ============================================================================

/// Something the bot sent through a [`MockServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// A regular message.
    Msg {
        /// Channel or nick.
        target: String,
        /// Text.
        text: String,
    },
    /// A notice.
    Notice {
        /// Channel or nick.
        target: String,
        /// Text.
        text: String,
    },
}

/// An in-memory [`Server`] recording outgoing traffic.
///
/// # Example
///
/// ```rust,ignore
/// let server = MockServer::new("testnet");
/// server.join("#chan", "alice", "o");
/// assert!(server.has_privs("#chan", "alice", 'h'));
/// ```
#[derive(Debug, Default)]
pub struct MockServer {
    name: String,
    channels: Mutex<HashMap<String, Vec<(String, String)>>>,
    sent: Mutex<Vec<Sent>>,
}

impl MockServer {
    /// Create a server with no channels.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            ..Self::default()
        })
    }

    /// Put `nick` in `channel` holding the prefix mode letters `modes`.
    pub fn join(&self, channel: &str, nick: &str, modes: &str) {
        let mut channels = self.channels.lock();
        let members = channels.entry(self.casefold(channel)).or_default();
        members.retain(|(existing, _)| !existing.eq_ignore_ascii_case(nick));
        members.push((nick.to_string(), modes.to_string()));
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Texts of messages sent to `target`.
    pub fn messages_to(&self, target: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Msg { target: t, text } if t == target => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Texts of notices sent to `target`.
    pub fn notices_to(&self, target: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Notice { target: t, text } if t == target => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget everything sent so far.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Server for MockServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel_members(&self, channel: &str) -> Vec<String> {
        self.channels
            .lock()
            .get(&self.casefold(channel))
            .map(|members| members.iter().map(|(nick, _)| nick.clone()).collect())
            .unwrap_or_default()
    }

    fn member_modes(&self, channel: &str, nick: &str) -> Option<String> {
        let folded = self.casefold(nick);
        self.channels
            .lock()
            .get(&self.casefold(channel))?
            .iter()
            .find(|(member, _)| self.casefold(member) == folded)
            .map(|(_, modes)| modes.clone())
    }

    fn msg(&self, target: &str, text: &str) {
        self.sent.lock().push(Sent::Msg {
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    fn notice(&self, target: &str, text: &str) {
        self.sent.lock().push(Sent::Notice {
            target: target.to_string(),
            text: text.to_string(),
        });
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// Accounts keyed by nick, each with a fixed level.
#[derive(Debug, Default)]
pub struct StaticAccounts {
    accounts: HashMap<String, (String, UserLevel)>,
}

impl StaticAccounts {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log `nick` in as `account` with `level`.
    pub fn with(mut self, nick: &str, account: &str, level: UserLevel) -> Self {
        self.accounts
            .insert(nick.to_lowercase(), (account.to_string(), level));
        self
    }
}

impl Accounts for StaticAccounts {
    fn account(&self, _server: &dyn Server, source: &str) -> Option<String> {
        let nick = source.split('!').next().unwrap_or_default().to_lowercase();
        self.accounts.get(&nick).map(|(account, _)| account.clone())
    }

    fn access_level(&self, account: &str) -> UserLevel {
        self.accounts
            .values()
            .find(|(name, _)| name == account)
            .map(|(_, level)| *level)
            .unwrap_or(UserLevel::NO_PRIVS)
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// Collects values pushed from background tasks.
///
/// Clones share the same storage.
pub struct Recorder<T> {
    inner: Arc<RecorderInner<T>>,
}

struct RecorderInner<T> {
    items: Mutex<Vec<T>>,
    notify: Notify,
}

impl<T: Clone> Recorder<T> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RecorderInner {
                items: Mutex::new(Vec::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Record a value.
    pub fn push(&self, item: T) {
        self.inner.items.lock().push(item);
        self.inner.notify.notify_waiters();
    }

    /// A copy of everything recorded.
    pub fn items(&self) -> Vec<T> {
        self.inner.items.lock().clone()
    }

    /// Number of recorded values.
    pub fn count(&self) -> usize {
        self.inner.items.lock().len()
    }

    /// Wait until at least `count` values were recorded. Returns `false` if
    /// `limit` elapsed first.
    pub async fn wait_for(&self, count: usize, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            let notified = self.inner.notify.notified();
            if self.count() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.count() >= count;
            }
        }
    }
}

impl<T: Clone> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A command handler recording every context it is called with.
pub fn recording_command(recorder: &Recorder<CommandContext>) -> CommandHandler {
    let recorder = recorder.clone();
    CommandHandler::new(move |ctx| {
        let recorder = recorder.clone();
        async move {
            recorder.push(ctx);
            Ok(())
        }
    })
}

/// A listener recording every event it observes.
pub fn recording_listener(recorder: &Recorder<Event>) -> ListenerHandler {
    let recorder = recorder.clone();
    ListenerHandler::observe(move |event| {
        let recorder = recorder.clone();
        async move { recorder.push(event) }
    })
}

// ============================================================================
// Scripted Module
// ============================================================================

/// A module whose declarations are supplied by the test.
///
/// # Example
///
/// ```rust,ignore
/// let module = ScriptedModule::new("dice")
///     .command(Command::new("roll", recording_command(&calls)).alias("r"));
/// catalog.register_module("dice", move || module.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedModule {
    name: String,
    core: bool,
    standard: Vec<&'static str>,
    commands: Vec<Command>,
    admin_commands: Vec<Command>,
    listeners: Vec<ListenerSpec>,
}

impl ScriptedModule {
    /// A module with no declarations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Mark the module as core.
    pub fn core(mut self) -> Self {
        self.core = true;
        self
    }

    /// Opt into a standard admin command.
    pub fn standard_admin(mut self, name: &'static str) -> Self {
        self.standard.push(name);
        self
    }

    /// Declare a text command.
    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Declare an admin command.
    pub fn admin_command(mut self, command: Command) -> Self {
        self.admin_commands.push(command);
        self
    }

    /// Declare a listener binding.
    pub fn listener(mut self, spec: ListenerSpec) -> Self {
        self.listeners.push(spec);
        self
    }
}

impl Module for ScriptedModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_core(&self) -> bool {
        self.core
    }

    fn standard_admin_commands(&self) -> &[&str] {
        &self.standard
    }

    fn register(self: Arc<Self>, registrar: &mut Registrar) -> Result<(), ResolveError> {
        for command in &self.commands {
            registrar.command(command.clone())?;
        }
        for command in &self.admin_commands {
            registrar.admin_command(command.clone())?;
        }
        registrar.listeners(self.listeners.iter().cloned());
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

/// Nick the bot uses in constructed private messages.
pub const BOT_NICK: &str = "switchboard";

/// An inbound channel message from `nick`.
pub fn pubmsg(server: &Arc<MockServer>, channel: &str, nick: &str, text: &str) -> Event {
    Event::new(server.clone(), PUBMSG, Direction::In)
        .with_source(format!("{nick}!{nick}@example.net"))
        .with_target(channel)
        .with_argument(text)
}

/// An inbound private message from `nick` to the bot.
pub fn privmsg(server: &Arc<MockServer>, nick: &str, text: &str) -> Event {
    Event::new(server.clone(), PRIVMSG, Direction::In)
        .with_source(format!("{nick}!{nick}@example.net"))
        .with_target(BOT_NICK)
        .with_argument(text)
}
