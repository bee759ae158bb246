//! Text metadata resolver.
//!
//! Resolves `@key value` directive blocks into descriptors:
//!
//! ```text
//! Roll some dice
//! @alias r
//! @alias dice --- roll dice the long way
//! @usage <dice>
//! @call-level registered
//! ```
//!
//! ```text
//! @listen inline in pubmsg high
//! @listen both join
//! ```
//!
//! Keys are case-folded and `-` becomes `_`. A key without a value is a flag.

use switchboard_core::{
    Command, CommandHandler, CommandTable, DEFAULT_CHANNEL_MODE, DESCRIPTION_SEPARATOR,
    EventSelector, ListenDirection, ListenerHandler, ListenerSpec, Priority, Registrar,
    ResolveError, UserLevel,
};
use std::collections::BTreeMap;

const FLAG: &str = "true";

struct Directive<'a> {
    key: String,
    value: Option<&'a str>,
}

fn directives(metadata: &str) -> impl Iterator<Item = Directive<'_>> {
    metadata.lines().filter_map(|line| {
        let body = line.trim_start().strip_prefix('@')?;
        let (key, value) = match body.split_once(char::is_whitespace) {
            Some((key, value)) if !value.trim().is_empty() => (key, Some(value.trim())),
            Some((key, _)) => (key, None),
            None => (body, None),
        };
        Some(Directive {
            key: key.to_lowercase().replace('-', "_"),
            value,
        })
    })
}

fn parse_flag(value: Option<&str>) -> bool {
    !matches!(
        value.map(str::to_lowercase).as_deref(),
        Some("false" | "no" | "off" | "0")
    )
}

fn parse_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolve a command's metadata into a name → descriptor table.
///
/// A single-line block is just the summary. Otherwise the first line is the
/// first description and the remaining `@` lines are directives.
pub fn resolve_command(
    name: &str,
    metadata: &str,
    handler: CommandHandler,
) -> Result<CommandTable, ResolveError> {
    let mut command = Command::new(name, handler);
    let metadata = metadata.trim_end();

    let mut lines = metadata.lines();
    let summary = lines.next().unwrap_or_default().trim();
    if lines.next().is_none() {
        if !summary.is_empty() {
            command = command.description(summary);
        }
        return command.into_table();
    }
    if !summary.is_empty() && !summary.starts_with('@') {
        command = command.description(summary);
    }

    for Directive { key, value } in directives(metadata) {
        command = match (key.as_str(), value) {
            ("alias", Some(value)) => match value.split_once(DESCRIPTION_SEPARATOR) {
                Some((alias, text)) => command.described_alias(alias, text.trim()),
                None => command.alias(value),
            },
            ("channel_mode_restriction" | "chanrestrict" | "chan_restrict", value) => {
                let mode = value
                    .and_then(|v| v.chars().next())
                    .unwrap_or(DEFAULT_CHANNEL_MODE);
                command.channel_mode_restriction(mode)
            }
            ("usage", value) => command.usage(value.unwrap_or_default()),
            ("description", value) => command.description(value.unwrap_or_default()),
            ("call_level", Some(value)) => command.call_level(value.parse::<UserLevel>()?),
            ("view_level", Some(value)) => command.view_level(value.parse::<UserLevel>()?),
            ("call_level" | "view_level", None) => {
                return Err(ResolveError::UnknownLevel(String::new()));
            }
            ("global", value) => {
                command.global = parse_flag(value);
                command
            }
            ("bound", value) => command.bound(parse_flag(value)),
            ("channel_whitelist", Some(value)) => {
                parse_list(value).fold(command, |c, chan| c.channel_whitelist(chan))
            }
            ("user_whitelist", Some(value)) => {
                parse_list(value).fold(command, |c, nick| c.user_whitelist(nick))
            }
            (_, value) => command.extra(key.clone(), value.unwrap_or(FLAG)),
        };
    }

    command.into_table()
}

/// Resolve listener metadata into bindings. Each `@listen` closes the
/// binding being built; directives before it land in that binding's extras.
pub fn resolve_listeners(
    metadata: &str,
    handler: ListenerHandler,
) -> Result<Vec<ListenerSpec>, ResolveError> {
    let mut listeners = Vec::new();
    let mut extra = BTreeMap::new();

    for Directive { key, value } in directives(metadata) {
        if key == "listen" {
            let mut spec = parse_listen(value.unwrap_or_default(), handler.clone())?;
            spec.extra = std::mem::take(&mut extra);
            listeners.push(spec);
        } else {
            extra.insert(key, value.unwrap_or(FLAG).to_string());
        }
    }

    if listeners.is_empty() {
        return Err(ResolveError::NoListenDirective);
    }
    Ok(listeners)
}

/// Parse `[inline] [direction] event [priority]`.
pub fn parse_listen(value: &str, handler: ListenerHandler) -> Result<ListenerSpec, ResolveError> {
    let mut inline = false;
    let tokens: Vec<&str> = value
        .split_whitespace()
        .filter(|token| {
            let is_inline = token.eq_ignore_ascii_case("inline");
            inline |= is_inline;
            !is_inline
        })
        .collect();

    let (direction, event, priority) = match tokens.as_slice() {
        [event] => (ListenDirection::In, *event, Priority::NORMAL),
        [direction, event] => (direction.parse()?, *event, Priority::NORMAL),
        [direction, event, priority] => (direction.parse()?, *event, priority.parse()?),
        _ => return Err(ResolveError::MalformedListen(value.to_string())),
    };

    let mut spec = ListenerSpec::on(EventSelector::verb(event), handler)
        .direction(direction)
        .priority(priority);
    if inline {
        spec = spec.inline();
    }
    Ok(spec)
}

/// Declare commands and listeners on a [`Registrar`] from text metadata.
pub trait RegistrarExt {
    /// Declare a text command described by `metadata`.
    fn described_command(
        &mut self,
        name: &str,
        metadata: &str,
        handler: CommandHandler,
    ) -> Result<&mut Self, ResolveError>;

    /// Declare an admin command described by `metadata`.
    fn described_admin_command(
        &mut self,
        name: &str,
        metadata: &str,
        handler: CommandHandler,
    ) -> Result<&mut Self, ResolveError>;

    /// Declare the listener bindings described by `metadata`.
    fn described_listeners(
        &mut self,
        metadata: &str,
        handler: ListenerHandler,
    ) -> Result<&mut Self, ResolveError>;
}

impl RegistrarExt for Registrar {
    fn described_command(
        &mut self,
        name: &str,
        metadata: &str,
        handler: CommandHandler,
    ) -> Result<&mut Self, ResolveError> {
        let table = resolve_command(name, metadata, handler)?;
        Ok(self.command_table(table))
    }

    fn described_admin_command(
        &mut self,
        name: &str,
        metadata: &str,
        handler: CommandHandler,
    ) -> Result<&mut Self, ResolveError> {
        let table = resolve_command(name, metadata, handler)?;
        Ok(self.admin_command_table(table))
    }

    fn described_listeners(
        &mut self,
        metadata: &str,
        handler: ListenerHandler,
    ) -> Result<&mut Self, ResolveError> {
        let specs = resolve_listeners(metadata, handler)?;
        Ok(self.listeners(specs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_handler() -> CommandHandler {
        CommandHandler::new(|_ctx| async { Ok(()) })
    }

    fn listener_handler() -> ListenerHandler {
        ListenerHandler::observe(|_event| async {})
    }

    #[test]
    fn single_line_yields_minimal_descriptor() {
        let table = resolve_command("ping", "  Reply with pong  ", command_handler()).unwrap();
        assert_eq!(table.len(), 1);
        let ping = &table["ping"];
        assert_eq!(ping.description, vec!["--- Reply with pong"]);
        assert_eq!(ping.call_level, UserLevel::NO_PRIVS);
        assert!(ping.bound);
    }

    #[test]
    fn usage_and_description_are_zipped() {
        let metadata = "Load/Unload/Reload module specified by <name>
            @usage load/unload/reload [name]

            @description List loaded modules
            @usage list

            @call_level admin";
        let table = resolve_command("module", metadata, command_handler()).unwrap();
        let module = &table["module"];
        assert_eq!(
            module.description,
            vec![
                "load/unload/reload [name] --- Load/Unload/Reload module specified by <name>",
                "list --- List loaded modules",
            ]
        );
        assert_eq!(module.call_level, UserLevel::ADMIN);
        assert_eq!(module.effective_view_level(), UserLevel::ADMIN);
    }

    #[test]
    fn aliases_and_restrictions() {
        let metadata = "Roll dice
            @alias r
            @alias dice --- the long way
            @chanrestrict
            @Channel-Whitelist #games, #dice
            @cooldown 5";
        let table = resolve_command("roll", metadata, command_handler()).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), ["dice", "r", "roll"]);
        let roll = &table["roll"];
        assert_eq!(roll.channel_mode_restriction, Some('h'));
        assert_eq!(roll.channel_whitelist, vec!["#games", "#dice"]);
        assert_eq!(roll.extra.get("cooldown").map(String::as_str), Some("5"));
        assert_eq!(table["r"].alias_of.as_deref(), Some("roll"));
        assert_eq!(table["dice"].description, vec!["--- the long way"]);
        assert_eq!(table["dice"].handler.id(), roll.handler.id());
    }

    #[test]
    fn explicit_mode_and_global_flag() {
        let metadata = "Reboot
            @channel_mode_restriction o
            @global";
        let table = resolve_command("reboot", metadata, command_handler()).unwrap();
        assert_eq!(table["reboot"].channel_mode_restriction, Some('o'));
        assert!(table["reboot"].global);
    }

    #[test]
    fn unknown_level_is_fatal() {
        let err = resolve_command("x", "X\n@call_level wizard", command_handler()).unwrap_err();
        assert_eq!(err, ResolveError::UnknownLevel("wizard".into()));
    }

    #[test]
    fn listen_directives_open_fresh_bindings() {
        let metadata = "@note first
            @listen inline in pubmsg high
            @listen both join
            @listen quit
            @listen out privmsg -5";
        let handler = listener_handler();
        let specs = resolve_listeners(metadata, handler.clone()).unwrap();
        assert_eq!(specs.len(), 4);

        assert!(specs[0].inline);
        assert_eq!(specs[0].direction, ListenDirection::In);
        assert_eq!(specs[0].event, EventSelector::Verb("pubmsg".into()));
        assert_eq!(specs[0].priority, Priority::HIGH);
        assert_eq!(specs[0].extra.get("note").map(String::as_str), Some("first"));

        assert_eq!(specs[1].direction, ListenDirection::Both);
        assert_eq!(specs[1].priority, Priority::NORMAL);
        assert!(specs[1].extra.is_empty());

        assert_eq!(specs[2].direction, ListenDirection::In);
        assert_eq!(specs[2].event, EventSelector::Verb("quit".into()));

        assert_eq!(specs[3].direction, ListenDirection::Out);
        assert_eq!(specs[3].priority, Priority(-5));

        assert!(specs.iter().all(|s| s.handler == handler));
    }

    #[test]
    fn malformed_listen_is_rejected() {
        assert!(matches!(
            resolve_listeners("@listen", listener_handler()),
            Err(ResolveError::MalformedListen(_))
        ));
        assert!(matches!(
            resolve_listeners("@listen in pubmsg high extra", listener_handler()),
            Err(ResolveError::MalformedListen(_))
        ));
        assert!(matches!(
            resolve_listeners("@listen in pubmsg soonish", listener_handler()),
            Err(ResolveError::UnknownPriority(_))
        ));
        assert!(matches!(
            resolve_listeners("no directives here", listener_handler()),
            Err(ResolveError::NoListenDirective)
        ));
    }

    #[test]
    fn registrar_accepts_text_metadata() {
        let mut registrar = Registrar::new();
        registrar
            .described_command("roll", "Roll dice\n@alias r", command_handler())
            .unwrap()
            .described_admin_command("rehash", "Reread config\n@global", command_handler())
            .unwrap()
            .described_listeners("@listen both join\n@listen both join", listener_handler())
            .unwrap();
        let declarations = registrar.finish();

        assert_eq!(declarations.commands.len(), 2);
        assert!(declarations.admin_commands.is_empty());
        assert!(declarations.global_admin_commands.contains_key("rehash"));
        assert_eq!(declarations.listeners.len(), 1);
    }
}
