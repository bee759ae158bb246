//! # Command Router
//!
//! Turns inbound chat messages into command invocations.
//!
//! Text commands start with the command prefix and are looked up in every
//! loaded module in name order, first by literal name and then through the
//! module's `*` wildcard. Admin commands start with the admin prefix, are
//! only accepted in private messages and are looked up in the global admin
//! table by the first token and in the named module's admin table by the
//! second.
//!
//! Every match that passes the privilege and channel checks is submitted to
//! the task pool; nothing is awaited.

use crate::{
    admin::ignored_nicks,
    pool::TaskPool,
    registry::{LoadedModule, Registry},
};
use std::{collections::HashSet, sync::Arc};
use switchboard_core::{Command, CommandContext, Event, Invocation, Target, UserLevel};
use tracing::{debug, trace, warn};

/// Name of the per-module fallback command.
pub const WILDCARD: &str = "*";

/// Routes chat messages to text and admin commands.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    registry: Arc<Registry>,
    pool: TaskPool,
}

impl CommandRouter {
    /// Create a router over `registry`, submitting handlers to `pool`.
    pub fn new(registry: Arc<Registry>, pool: TaskPool) -> Self {
        Self { registry, pool }
    }

    /// Route an inbound chat message. Returns how many handlers were started.
    pub fn route(&self, event: &Event) -> usize {
        if !event.is_chat_message() {
            return 0;
        }
        let mut started = self.route_command(event);
        if event.is_private_message() {
            started += self.route_admin(event);
        }
        started
    }

    /// Text command path.
    pub fn route_command(&self, event: &Event) -> usize {
        let settings = self.registry.settings();
        let Some(rest) = event
            .message()
            .and_then(|text| text.strip_prefix(settings.command_prefix.as_str()))
        else {
            return 0;
        };
        let rest = rest.trim();
        if rest.is_empty() {
            return 0;
        }
        let (name, arguments) = split_word(rest);
        let name = name.to_lowercase();
        let level = event.source_user_level.unwrap_or(UserLevel::NO_PRIVS);

        let mut called = HashSet::new();
        let mut started = 0;
        for loaded in self.registry.modules() {
            if is_ignored(&loaded, event) {
                trace!(module = %loaded.name(), nick = %event.source_nick(), "Source is ignored");
                continue;
            }
            for (lookup, literal) in [(name.as_str(), true), (WILDCARD, false)] {
                let Some(command) = loaded.commands().get(lookup) else {
                    continue;
                };
                if level < command.call_level {
                    if literal {
                        deny(event, command, level);
                    }
                    continue;
                }
                if !channel_allowed(event, command) {
                    debug!(command = %command.name, nick = %event.source_nick(), "Command not allowed here");
                    continue;
                }
                if !called.insert(command.handler.id()) {
                    continue;
                }
                let invocation = Invocation::new(name.clone(), arguments);
                if self.start(event, &loaded, command, invocation) {
                    started += 1;
                }
            }
        }
        started
    }

    /// Admin command path. Only private messages are considered.
    pub fn route_admin(&self, event: &Event) -> usize {
        if !event.is_private_message() {
            return 0;
        }
        let settings = self.registry.settings();
        let Some(rest) = event
            .message()
            .and_then(|text| text.strip_prefix(settings.admin_command_prefix.as_str()))
        else {
            return 0;
        };
        let rest = rest.trim();
        if rest.is_empty() {
            return 0;
        }
        let (module_token, remainder) = split_word(rest);
        let (command_token, command_args) = split_word(remainder);
        let module_token = module_token.to_lowercase();
        let command_token = command_token.to_lowercase();
        let level = event.source_user_level.unwrap_or(UserLevel::NO_PRIVS);

        let mut found: Vec<(LoadedModule, Arc<Command>, Invocation)> = Vec::new();
        for entry in self.registry.global_admin(&module_token) {
            if let Some(owner) = self.registry.module(&entry.owner) {
                let invocation = Invocation::new(module_token.clone(), remainder);
                found.push((owner, entry.command.command().clone(), invocation));
            }
        }
        if let Some(loaded) = self.registry.find_module(&module_token) {
            if let Some(admin) = loaded.admin_commands().get(&command_token) {
                let command = admin.command().clone();
                let invocation = Invocation::new(command_token.clone(), command_args);
                found.push((loaded, command, invocation));
            }
        }

        let mut started = 0;
        for (owner, command, invocation) in found {
            if level < command.call_level {
                deny(event, &command, level);
                continue;
            }
            if self.start(event, &owner, &command, invocation) {
                started += 1;
            }
        }
        started
    }

    fn start(
        &self,
        event: &Event,
        loaded: &LoadedModule,
        command: &Arc<Command>,
        invocation: Invocation,
    ) -> bool {
        let ctx = CommandContext {
            event: event.clone(),
            command: command.clone(),
            invocation,
            module: command.receives_module().then(|| loaded.module().clone()),
            store: loaded.store().clone(),
        };
        debug!(
            module = %loaded.name(),
            command = %command.name,
            nick = %event.source_nick(),
            "Dispatching command"
        );
        let label = format!("{}:{}", loaded.name(), command.name);
        self.pool.submit(label, command.handler.call(ctx))
    }
}

/// First word and the rest, with the whitespace between them dropped.
fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn deny(event: &Event, command: &Command, level: UserLevel) {
    warn!(
        command = %command.name,
        nick = %event.source_nick(),
        level = %level,
        required = %command.call_level,
        "Insufficient privileges"
    );
    event.server.notice(
        event.source_nick(),
        &format!("Insufficient privileges for {}", command.name),
    );
}

fn is_ignored(loaded: &LoadedModule, event: &Event) -> bool {
    let nicks = ignored_nicks(loaded.store().as_ref());
    if nicks.is_empty() {
        return false;
    }
    let nick = event.server.casefold(event.source_nick());
    nicks.contains(&nick)
}

/// Channel mode restriction and whitelist checks.
fn channel_allowed(event: &Event, command: &Command) -> bool {
    let server = &event.server;
    let nick = event.source_nick();
    let origin = event.from_to();

    if let Some(mode) = command.channel_mode_restriction {
        match &origin {
            Target::User(_) => return false,
            Target::Channel(channel) => {
                if !server.has_privs(channel, nick, mode) {
                    return false;
                }
            }
        }
    }

    if command.channel_whitelist.is_empty() && command.user_whitelist.is_empty() {
        return true;
    }
    if let Target::Channel(channel) = &origin {
        let channel = server.casefold(channel);
        if command
            .channel_whitelist
            .iter()
            .any(|allowed| server.casefold(allowed) == channel)
        {
            return true;
        }
    }
    let nick = server.casefold(nick);
    command
        .user_whitelist
        .iter()
        .any(|allowed| server.casefold(allowed) == nick)
        || command.channel_whitelist.iter().any(|allowed| {
            server
                .channel_members(allowed)
                .iter()
                .any(|member| server.casefold(member) == nick)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::Catalog,
        testing::{MockServer, Recorder, ScriptedModule, privmsg, pubmsg, recording_command},
    };
    use std::time::Duration;
    use switchboard_core::{Module, Settings};

    const WAIT: Duration = Duration::from_secs(5);

    fn router(modules: Vec<ScriptedModule>) -> CommandRouter {
        let mut catalog = Catalog::new();
        for module in modules {
            let name = module.name().to_string();
            catalog.register_module(name, move || module.clone());
        }
        let registry = Registry::builder()
            .catalog(catalog)
            .settings(Settings::default())
            .build();
        registry.load_init();
        CommandRouter::new(registry, TaskPool::default())
    }

    fn with_level(mut event: Event, level: UserLevel) -> Event {
        event.source_user_level = Some(level);
        event
    }

    #[tokio::test]
    async fn prefix_must_match_exactly() {
        let calls = Recorder::new();
        let router = router(vec![ScriptedModule::new("dice").command(
            Command::new("roll", recording_command(&calls)),
        )]);
        let server = MockServer::new("testnet");

        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", "roll 2d6")), 0);
        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", " .roll 2d6")), 0);
        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", ".   ")), 0);
        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", ".ROLL  2d6 ")), 1);

        assert!(calls.wait_for(1, WAIT).await);
        let ctx = &calls.items()[0];
        assert_eq!(ctx.invocation, Invocation::new("roll", "2d6"));
        assert!(ctx.module.is_none());
    }

    #[tokio::test]
    async fn aliases_sharing_a_handler_fire_once() {
        let calls = Recorder::new();
        let handler = recording_command(&calls);
        let router = router(vec![
            ScriptedModule::new("dice")
                .command(Command::new("roll", handler.clone()).alias("r"))
                .command(Command::new(WILDCARD, handler)),
        ]);
        let server = MockServer::new("testnet");

        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", ".r 1d20")), 1);
        assert!(calls.wait_for(1, WAIT).await);
        assert_eq!(calls.items()[0].command.alias_of.as_deref(), Some("roll"));
    }

    #[tokio::test]
    async fn wildcard_runs_after_literal_in_module_order() {
        let calls = Recorder::new();
        let router = router(vec![
            ScriptedModule::new("beta").command(Command::new(WILDCARD, recording_command(&calls))),
            ScriptedModule::new("alpha").command(Command::new("quote", recording_command(&calls))),
        ]);
        let server = MockServer::new("testnet");

        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", ".quote 12")), 2);
        assert!(calls.wait_for(2, WAIT).await);
        let mut names: Vec<_> = calls.items().iter().map(|c| c.command.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["*", "quote"]);
        assert!(calls.items().iter().all(|c| c.invocation.command == "quote"));
    }

    #[tokio::test]
    async fn insufficient_level_notices_literal_matches_only() {
        let calls = Recorder::new();
        let router = router(vec![
            ScriptedModule::new("ops")
                .command(Command::new("kick", recording_command(&calls)).call_level(UserLevel::SUPERUSER))
                .command(Command::new(WILDCARD, recording_command(&calls)).call_level(UserLevel::ADMIN)),
        ]);
        let server = MockServer::new("testnet");

        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", ".kick bob")), 0);
        assert_eq!(server.notices_to("alice"), ["Insufficient privileges for kick"]);

        server.clear();
        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", ".other")), 0);
        assert!(server.sent().is_empty());

        let event = with_level(pubmsg(&server, "#chan", "alice", ".kick bob"), UserLevel::SUPERUSER);
        assert_eq!(router.route(&event), 1);
        assert!(calls.wait_for(1, WAIT).await);
    }

    #[tokio::test]
    async fn mode_restriction_requires_a_channel_and_privileges() {
        let calls = Recorder::new();
        let router = router(vec![ScriptedModule::new("ops").command(
            Command::new("topic", recording_command(&calls)).channel_mode_restriction('h'),
        )]);
        let server = MockServer::new("testnet");
        server.join("#chan", "alice", "o");
        server.join("#chan", "bob", "v");

        assert_eq!(router.route(&privmsg(&server, "alice", ".topic hi")), 0);
        assert_eq!(router.route(&pubmsg(&server, "#chan", "bob", ".topic hi")), 0);
        assert_eq!(router.route(&pubmsg(&server, "#chan", "alice", ".topic hi")), 1);
        assert!(calls.wait_for(1, WAIT).await);
    }

    #[tokio::test]
    async fn whitelists_expand_channel_members() {
        let calls = Recorder::new();
        let router = router(vec![ScriptedModule::new("staff").command(
            Command::new("deploy", recording_command(&calls))
                .channel_whitelist("#Staff")
                .user_whitelist("carol"),
        )]);
        let server = MockServer::new("testnet");
        server.join("#staff", "alice", "");

        assert_eq!(router.route(&pubmsg(&server, "#staff", "mallory", ".deploy")), 1);
        assert_eq!(router.route(&pubmsg(&server, "#lobby", "alice", ".deploy")), 1);
        assert_eq!(router.route(&privmsg(&server, "Carol", ".deploy")), 1);
        assert_eq!(router.route(&pubmsg(&server, "#lobby", "mallory", ".deploy")), 0);
        assert!(calls.wait_for(3, WAIT).await);
    }

    #[tokio::test]
    async fn ignored_nicks_are_skipped_per_module() {
        let calls = Recorder::new();
        let router = router(vec![
            ScriptedModule::new("dice").command(Command::new("roll", recording_command(&calls))),
            ScriptedModule::new("fun").command(Command::new("roll", recording_command(&calls))),
        ]);
        let dice = router.registry.module("dice").unwrap();
        dice.store()
            .set(crate::admin::IGNORED_KEY, serde_json::json!(["troll"]));
        let server = MockServer::new("testnet");

        assert_eq!(router.route(&pubmsg(&server, "#chan", "Troll", ".roll")), 1);
        assert!(calls.wait_for(1, WAIT).await);
        assert_eq!(calls.items()[0].store.get(crate::admin::IGNORED_KEY), None);
    }

    #[tokio::test]
    async fn admin_commands_only_arrive_by_private_message() {
        let calls = Recorder::new();
        let router = router(vec![
            ScriptedModule::new("dice")
                .admin_command(Command::new("reset", recording_command(&calls)).bound(false))
                .admin_command(Command::new("rehash", recording_command(&calls)).global()),
        ]);
        let server = MockServer::new("testnet");

        let public = with_level(pubmsg(&server, "#chan", "root", "'dice reset"), UserLevel::ADMIN);
        assert_eq!(router.route(&public), 0);

        let scoped = with_level(privmsg(&server, "root", "'DICE reset all now"), UserLevel::ADMIN);
        assert_eq!(router.route(&scoped), 1);
        assert!(calls.wait_for(1, WAIT).await);
        let ctx = calls.items()[0].clone();
        assert_eq!(ctx.invocation, Invocation::new("reset", "all now"));
        assert_eq!(ctx.module.map(|m| m.name().to_string()).as_deref(), Some("dice"));

        let global = with_level(privmsg(&server, "root", "'rehash config now"), UserLevel::ADMIN);
        assert_eq!(router.route(&global), 1);
        assert!(calls.wait_for(2, WAIT).await);
        let ctx = calls.items()[1].clone();
        assert_eq!(ctx.invocation, Invocation::new("rehash", "config now"));
        assert!(ctx.module.is_none());

        assert_eq!(router.route(&privmsg(&server, "root", "'nosuch thing")), 0);
        assert!(server.sent().is_empty());
    }

    #[tokio::test]
    async fn admin_tokens_split_on_any_whitespace() {
        let calls = Recorder::new();
        let router = router(vec![
            ScriptedModule::new("dice")
                .admin_command(Command::new("reset", recording_command(&calls)))
                .admin_command(Command::new("rehash", recording_command(&calls)).global()),
        ]);
        let server = MockServer::new("testnet");

        let scoped = with_level(privmsg(&server, "root", "'dice  \treset   all now"), UserLevel::ADMIN);
        assert_eq!(router.route(&scoped), 1);
        assert!(calls.wait_for(1, WAIT).await);
        assert_eq!(calls.items()[0].invocation, Invocation::new("reset", "all now"));

        let global = with_level(privmsg(&server, "root", "'rehash\t  config"), UserLevel::ADMIN);
        assert_eq!(router.route(&global), 1);
        assert!(calls.wait_for(2, WAIT).await);
        assert_eq!(calls.items()[1].invocation, Invocation::new("rehash", "config"));
    }

    #[tokio::test]
    async fn admin_privilege_failure_sends_a_notice() {
        let calls = Recorder::new();
        let router = router(vec![ScriptedModule::new("dice").admin_command(
            Command::new("reset", recording_command(&calls)).call_level(UserLevel::ADMIN),
        )]);
        let server = MockServer::new("testnet");

        let event = with_level(privmsg(&server, "eve", "'dice reset"), UserLevel::REGISTERED);
        assert_eq!(router.route(&event), 0);
        assert_eq!(server.notices_to("eve"), ["Insufficient privileges for reset"]);
        assert_eq!(calls.count(), 0);
    }
}
