//! # Descriptors
//!
//! Strongly-typed value objects a module declares: [`Command`],
//! [`AdminCommand`] and [`ListenerSpec`]. Commands are built with chainable
//! setters and materialized with [`Command::into_table`], which expands
//! aliases into independent descriptors sharing one handler.

use crate::{
    error::ResolveError,
    handler::{CommandHandler, ListenerHandler},
    level::{Priority, UserLevel},
};
use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

/// Separator between a usage line and its description.
pub const DESCRIPTION_SEPARATOR: &str = "---";

/// Default mode letter for a bare channel-mode restriction (halfop).
pub const DEFAULT_CHANNEL_MODE: char = 'h';

/// Name → descriptor map produced by [`Command::into_table`].
pub type CommandTable = BTreeMap<String, Arc<Command>>;

/// A text command descriptor.
#[derive(Debug, Clone)]
pub struct Command {
    /// Name this descriptor is registered under.
    pub name: String,
    /// Canonical command name; aliases point here.
    pub base_name: String,
    /// Canonical name if this descriptor is an alias.
    pub alias_of: Option<String>,
    /// Additional names sharing this descriptor.
    pub aliases: Vec<String>,
    /// Additional names with their own description.
    pub described_aliases: Vec<(String, String)>,
    /// The callback.
    pub handler: CommandHandler,
    /// Help lines. After [`Command::into_table`] these are `usage --- text`
    /// pairs, or `--- text` when no usage was declared.
    pub description: Vec<String>,
    /// Raw usage lines.
    pub usage: Vec<String>,
    /// Minimum level to invoke.
    pub call_level: UserLevel,
    /// Minimum level to see in help; defaults to `call_level`.
    pub view_level: Option<UserLevel>,
    /// Channels this command is restricted to; empty means anywhere.
    pub channel_whitelist: Vec<String>,
    /// Nicks this command is restricted to.
    pub user_whitelist: Vec<String>,
    /// Minimum prefix mode the caller must hold in the invoking channel.
    pub channel_mode_restriction: Option<char>,
    /// `false` passes the owning module to the handler.
    pub bound: bool,
    /// Admin commands only: invoked as `<command> args` from any namespace.
    pub global: bool,
    /// Unrecognized directives, kept verbatim.
    pub extra: BTreeMap<String, String>,
}

impl Command {
    /// Create a bound, unrestricted command callable by everyone.
    pub fn new(name: impl Into<String>, handler: CommandHandler) -> Self {
        let name = name.into().trim().to_lowercase();
        Self {
            base_name: name.clone(),
            name,
            alias_of: None,
            aliases: Vec::new(),
            described_aliases: Vec::new(),
            handler,
            description: Vec::new(),
            usage: Vec::new(),
            call_level: UserLevel::NO_PRIVS,
            view_level: None,
            channel_whitelist: Vec::new(),
            user_whitelist: Vec::new(),
            channel_mode_restriction: None,
            bound: true,
            global: false,
            extra: BTreeMap::new(),
        }
    }

    /// Add an alias sharing this descriptor.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into().trim().to_lowercase());
        self
    }

    /// Add an alias with its own description.
    pub fn described_alias(mut self, alias: impl Into<String>, description: impl Into<String>) -> Self {
        self.described_aliases
            .push((alias.into().trim().to_lowercase(), description.into()));
        self
    }

    /// Add a description line.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description.push(text.into());
        self
    }

    /// Add a usage line.
    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.usage.push(text.into());
        self
    }

    /// Set the minimum level to invoke.
    pub fn call_level(mut self, level: UserLevel) -> Self {
        self.call_level = level;
        self
    }

    /// Set the minimum level to see the command in help.
    pub fn view_level(mut self, level: UserLevel) -> Self {
        self.view_level = Some(level);
        self
    }

    /// Require the caller to hold at least `mode` in the invoking channel.
    pub fn channel_mode_restriction(mut self, mode: char) -> Self {
        self.channel_mode_restriction = Some(mode);
        self
    }

    /// Restrict the command to a channel (and its members).
    pub fn channel_whitelist(mut self, channel: impl Into<String>) -> Self {
        self.channel_whitelist.push(channel.into());
        self
    }

    /// Restrict the command to a nick.
    pub fn user_whitelist(mut self, nick: impl Into<String>) -> Self {
        self.user_whitelist.push(nick.into());
        self
    }

    /// Set whether the handler already carries its module.
    pub fn bound(mut self, bound: bool) -> Self {
        self.bound = bound;
        self
    }

    /// Mark an admin command as global.
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    /// Store a free-form key.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Effective view level.
    pub fn effective_view_level(&self) -> UserLevel {
        self.view_level.unwrap_or(self.call_level)
    }

    /// Whether the handler receives its module implicitly.
    pub fn receives_module(&self) -> bool {
        !self.bound
    }

    /// Materialize this declaration into a name → descriptor table.
    ///
    /// The canonical name maps to the declaration itself; each alias maps to
    /// a copy carrying `alias_of`. Described aliases replace the help text.
    pub fn into_table(mut self) -> Result<CommandTable, ResolveError> {
        if self.name.is_empty() {
            return Err(ResolveError::EmptyName);
        }
        self.description = combine_help(&self.usage, &self.description);

        let aliases = std::mem::take(&mut self.aliases);
        let described = std::mem::take(&mut self.described_aliases);
        let mut table = CommandTable::new();

        for alias in aliases.into_iter().filter(|a| !a.is_empty()) {
            let mut copy = self.clone();
            copy.alias_of = Some(self.base_name.clone());
            copy.name = alias.clone();
            table.insert(alias, Arc::new(copy));
        }
        for (alias, text) in described.into_iter().filter(|(a, _)| !a.is_empty()) {
            let mut copy = self.clone();
            copy.alias_of = Some(self.base_name.clone());
            copy.name = alias.clone();
            copy.description = vec![format!("{DESCRIPTION_SEPARATOR} {}", text.trim())];
            table.insert(alias, Arc::new(copy));
        }
        table.insert(self.name.clone(), Arc::new(self));
        Ok(table)
    }
}

/// Zip usage lines with description lines. Overflowing usage lines reuse the
/// last description.
fn combine_help(usage: &[String], description: &[String]) -> Vec<String> {
    if usage.is_empty() {
        return description
            .iter()
            .map(|d| {
                if d.starts_with(DESCRIPTION_SEPARATOR) {
                    d.clone()
                } else {
                    format!("{DESCRIPTION_SEPARATOR} {d}")
                }
            })
            .collect();
    }
    usage
        .iter()
        .enumerate()
        .map(|(i, use_line)| {
            match description.get(i).or_else(|| description.last()) {
                Some(desc) => format!("{use_line} {DESCRIPTION_SEPARATOR} {desc}"),
                None => use_line.clone(),
            }
        })
        .collect()
}

/// A command reached through the admin prefix.
#[derive(Debug, Clone)]
pub struct AdminCommand {
    command: Arc<Command>,
}

impl AdminCommand {
    /// Wrap a materialized command descriptor.
    pub fn new(command: Arc<Command>) -> Self {
        Self { command }
    }

    /// Whether this command lives in the global admin table.
    pub fn is_global(&self) -> bool {
        self.command.global
    }

    /// The underlying descriptor.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }
}

/// Direction a listener binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ListenDirection {
    /// Inbound events.
    #[default]
    In,
    /// Outbound events.
    Out,
    /// Both directions.
    Both,
}

impl ListenDirection {
    /// The wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ListenDirection::In => "in",
            ListenDirection::Out => "out",
            ListenDirection::Both => "both",
        }
    }
}

impl From<crate::event::Direction> for ListenDirection {
    fn from(direction: crate::event::Direction) -> Self {
        match direction {
            crate::event::Direction::In => ListenDirection::In,
            crate::event::Direction::Out => ListenDirection::Out,
        }
    }
}

impl FromStr for ListenDirection {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(ListenDirection::In),
            "out" => Ok(ListenDirection::Out),
            "both" => Ok(ListenDirection::Both),
            other => Err(ResolveError::UnknownDirection(other.to_string())),
        }
    }
}

/// Event type a listener binds to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventSelector {
    /// Every event type.
    All,
    /// One verb, lower-cased.
    Verb(String),
}

impl EventSelector {
    /// Selector for a single verb. `all` and `*` select everything.
    pub fn verb(verb: &str) -> Self {
        match verb.trim().to_lowercase().as_str() {
            "all" | "*" => EventSelector::All,
            other => EventSelector::Verb(other.to_string()),
        }
    }
}

impl From<&str> for EventSelector {
    fn from(verb: &str) -> Self {
        EventSelector::verb(verb)
    }
}

impl fmt::Display for EventSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSelector::All => f.write_str("all"),
            EventSelector::Verb(verb) => f.write_str(verb),
        }
    }
}

/// One listener binding.
#[derive(Debug, Clone)]
pub struct ListenerSpec {
    /// The callback.
    pub handler: ListenerHandler,
    /// Bound direction.
    pub direction: ListenDirection,
    /// Bound event type.
    pub event: EventSelector,
    /// Dispatch priority.
    pub priority: Priority,
    /// Run synchronously in the dispatch pipeline.
    pub inline: bool,
    /// Unrecognized directives, kept verbatim.
    pub extra: BTreeMap<String, String>,
}

impl ListenerSpec {
    /// A background listener on inbound `event` at normal priority.
    pub fn on(event: impl Into<EventSelector>, handler: ListenerHandler) -> Self {
        Self {
            handler,
            direction: ListenDirection::In,
            event: event.into(),
            priority: Priority::NORMAL,
            inline: false,
            extra: BTreeMap::new(),
        }
    }

    /// Set the direction.
    pub fn direction(mut self, direction: ListenDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Run inline.
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Index key for this binding.
    pub fn key(&self) -> ListenerKey {
        ListenerKey {
            priority: self.priority,
            direction: self.direction,
            event: self.event.clone(),
        }
    }
}

/// Position of a binding in the listener index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerKey {
    /// Priority level.
    pub priority: Priority,
    /// Direction level.
    pub direction: ListenDirection,
    /// Event-type level.
    pub event: EventSelector,
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.priority.0,
            self.direction.as_str(),
            self.event
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CommandHandler {
        CommandHandler::new(|_ctx| async { Ok(()) })
    }

    #[test]
    fn aliases_share_handler_and_link_to_base() {
        let table = Command::new("Roll", noop())
            .alias("r")
            .described_alias("dice", "roll some dice")
            .description("Roll dice")
            .into_table()
            .unwrap();

        assert_eq!(table.len(), 3);
        let base = &table["roll"];
        let alias = &table["r"];
        let described = &table["dice"];
        assert_eq!(base.alias_of, None);
        assert_eq!(alias.alias_of.as_deref(), Some("roll"));
        assert_eq!(alias.base_name, "roll");
        assert_eq!(alias.handler.id(), base.handler.id());
        assert_eq!(described.handler.id(), base.handler.id());
        assert_eq!(described.description, vec!["--- roll some dice".to_string()]);
        assert_eq!(base.description, vec!["--- Roll dice".to_string()]);
    }

    #[test]
    fn usage_overflow_reuses_last_description() {
        let table = Command::new("module", noop())
            .description("Load or unload modules")
            .usage("load <name>")
            .usage("unload <name>")
            .usage("list")
            .into_table()
            .unwrap();
        assert_eq!(
            table["module"].description,
            vec![
                "load <name> --- Load or unload modules",
                "unload <name> --- Load or unload modules",
                "list --- Load or unload modules",
            ]
        );
    }

    #[test]
    fn view_level_defaults_to_call_level() {
        let cmd = Command::new("x", noop()).call_level(UserLevel::ADMIN);
        assert_eq!(cmd.effective_view_level(), UserLevel::ADMIN);
        let cmd = cmd.view_level(UserLevel::NO_PRIVS);
        assert_eq!(cmd.effective_view_level(), UserLevel::NO_PRIVS);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(
            Command::new("  ", noop()).into_table().unwrap_err(),
            ResolveError::EmptyName
        );
    }

    #[test]
    fn selectors_and_directions_parse() {
        assert_eq!(EventSelector::verb("ALL"), EventSelector::All);
        assert_eq!(EventSelector::verb("PubMsg"), EventSelector::Verb("pubmsg".into()));
        assert_eq!("both".parse::<ListenDirection>().unwrap(), ListenDirection::Both);
        assert!("sideways".parse::<ListenDirection>().is_err());
    }
}
