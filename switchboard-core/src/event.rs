//! Protocol events and the transport collaborator they travel with.
//!
//! The core never constructs events on its own; the transport hands them to
//! the bus and inline listeners may hand back replacements.

use crate::level::UserLevel;
use std::{fmt, sync::Arc};

/// Verb of an inbound private message.
pub const PRIVMSG: &str = "privmsg";
/// Verb of an inbound channel message.
pub const PUBMSG: &str = "pubmsg";

/// Prefix modes from highest to lowest: owner, admin, op, halfop, voice.
const PREFIX_MODES: [char; 5] = ['q', 'a', 'o', 'h', 'v'];

/// Rank of a channel prefix mode letter; lower is more privileged.
pub fn mode_rank(mode: char) -> Option<usize> {
    PREFIX_MODES.iter().position(|m| *m == mode)
}

/// Direction an event travels relative to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Received from the network.
    In,
    /// Sent by the bot.
    Out,
}

impl Direction {
    /// The wire name, `in` or `out`.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Where replies to an event should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A channel, by name.
    Channel(String),
    /// A user, by nick.
    User(String),
}

impl Target {
    /// Whether this is a channel.
    pub fn is_channel(&self) -> bool {
        matches!(self, Target::Channel(_))
    }

    /// The channel name or nick.
    pub fn name(&self) -> &str {
        match self {
            Target::Channel(name) | Target::User(name) => name,
        }
    }
}

/// The connection an event came from.
///
/// Implemented by the transport. The dispatch core only needs channel
/// membership, prefix-mode lookups and a way to send short replies.
pub trait Server: Send + Sync + 'static {
    /// Connection name, used in logs.
    fn name(&self) -> &str;

    /// Whether `name` is a channel on this server.
    fn is_channel(&self, name: &str) -> bool {
        name.starts_with(['#', '&', '!', '+'])
    }

    /// Case-fold `text` with the server's casemapping (rfc1459 by default).
    fn casefold(&self, text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '[' => '{',
                ']' => '}',
                '\\' => '|',
                '~' => '^',
                other => other.to_ascii_lowercase(),
            })
            .collect()
    }

    /// Nicks currently in `channel`.
    fn channel_members(&self, channel: &str) -> Vec<String>;

    /// Prefix mode letters `nick` holds in `channel`, or `None` if absent.
    fn member_modes(&self, channel: &str, nick: &str) -> Option<String>;

    /// Whether `nick` holds `lowest_mode` or any higher prefix mode in `channel`.
    fn has_privs(&self, channel: &str, nick: &str, lowest_mode: char) -> bool {
        let Some(required) = mode_rank(lowest_mode) else {
            return false;
        };
        self.member_modes(channel, nick)
            .map(|modes| {
                modes
                    .chars()
                    .filter_map(mode_rank)
                    .any(|rank| rank <= required)
            })
            .unwrap_or(false)
    }

    /// Send a message to a channel or nick.
    fn msg(&self, target: &str, text: &str);

    /// Send a notice to a channel or nick.
    fn notice(&self, target: &str, text: &str);
}

/// A protocol event.
#[derive(Clone)]
pub struct Event {
    /// Verb or numeric name, lower-cased (`privmsg`, `pubmsg`, `join`, ...).
    pub verb: String,
    /// Whether the event was received or sent.
    pub direction: Direction,
    /// Originating connection.
    pub server: Arc<dyn Server>,
    /// Source mask, `nick!user@host` for users.
    pub source: String,
    /// Target channel or nick.
    pub target: String,
    /// Trailing arguments; for messages the first one is the text.
    pub arguments: Vec<String>,
    /// Account of the source, attached before command routing.
    pub source_account: Option<String>,
    /// Privilege level of the source, attached before command routing.
    pub source_user_level: Option<UserLevel>,
}

impl Event {
    /// Create an event with no source, target or arguments.
    pub fn new(server: Arc<dyn Server>, verb: impl Into<String>, direction: Direction) -> Self {
        Self {
            verb: verb.into().to_lowercase(),
            direction,
            server,
            source: String::new(),
            target: String::new(),
            arguments: Vec::new(),
            source_account: None,
            source_user_level: None,
        }
    }

    /// Set the source mask.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Append an argument.
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Nick part of the source mask.
    pub fn source_nick(&self) -> &str {
        self.source.split('!').next().unwrap_or_default()
    }

    /// Message text, if any.
    pub fn message(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }

    /// Whether this is an inbound private or channel message.
    pub fn is_chat_message(&self) -> bool {
        self.direction == Direction::In && (self.verb == PRIVMSG || self.verb == PUBMSG)
    }

    /// Whether this is an inbound private message.
    pub fn is_private_message(&self) -> bool {
        self.direction == Direction::In && self.verb == PRIVMSG
    }

    /// Where a reply to this event belongs: the channel it was said in, or
    /// the user who said it.
    pub fn from_to(&self) -> Target {
        if self.server.is_channel(&self.target) {
            Target::Channel(self.target.clone())
        } else if self.direction == Direction::In {
            Target::User(self.source_nick().to_string())
        } else {
            Target::User(self.target.clone())
        }
    }

    /// Reply to wherever this event came from.
    pub fn reply(&self, text: &str) {
        self.server.msg(self.from_to().name(), text);
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("verb", &self.verb)
            .field("direction", &self.direction)
            .field("server", &self.server.name())
            .field("source", &self.source)
            .field("target", &self.target)
            .field("arguments", &self.arguments)
            .field("source_account", &self.source_account)
            .field("source_user_level", &self.source_user_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Net;

    impl Server for Net {
        fn name(&self) -> &str {
            "net"
        }
        fn channel_members(&self, _channel: &str) -> Vec<String> {
            Vec::new()
        }
        fn member_modes(&self, _channel: &str, nick: &str) -> Option<String> {
            match nick {
                "op" => Some("o".into()),
                "voiced" => Some("v".into()),
                "plain" => Some(String::new()),
                _ => None,
            }
        }
        fn msg(&self, _target: &str, _text: &str) {}
        fn notice(&self, _target: &str, _text: &str) {}
    }

    #[test]
    fn from_to_prefers_channel_target() {
        let public = Event::new(Arc::new(Net), "PUBMSG", Direction::In)
            .with_source("alice!a@host")
            .with_target("#chan");
        assert_eq!(public.verb, "pubmsg");
        assert_eq!(public.from_to(), Target::Channel("#chan".into()));

        let private = Event::new(Arc::new(Net), PRIVMSG, Direction::In)
            .with_source("alice!a@host")
            .with_target("bot");
        assert_eq!(private.from_to(), Target::User("alice".into()));
        assert!(private.is_private_message());
    }

    #[test]
    fn has_privs_respects_mode_order() {
        let net = Net;
        assert!(net.has_privs("#c", "op", 'h'));
        assert!(net.has_privs("#c", "op", 'o'));
        assert!(!net.has_privs("#c", "voiced", 'o'));
        assert!(net.has_privs("#c", "voiced", 'v'));
        assert!(!net.has_privs("#c", "plain", 'v'));
        assert!(!net.has_privs("#c", "absent", 'v'));
        assert!(!net.has_privs("#c", "op", 'x'));
    }

    #[test]
    fn rfc1459_casefold() {
        assert_eq!(Net.casefold("#Chan[1]"), "#chan{1}");
    }
}
