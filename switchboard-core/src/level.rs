//! Privilege levels and listener priorities.

use crate::error::ResolveError;
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// A caller's privilege ordinal.
///
/// Levels are totally ordered; [`UserLevel::NO_PRIVS`] is the minimum and
/// [`UserLevel::ADMIN`] the maximum any account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct UserLevel(u8);

impl UserLevel {
    /// Unauthenticated or unknown callers.
    pub const NO_PRIVS: UserLevel = UserLevel(0);
    /// Callers with a registered account.
    pub const REGISTERED: UserLevel = UserLevel(1);
    /// Trusted accounts below full admin.
    pub const SUPERUSER: UserLevel = UserLevel(5);
    /// Bot administrators.
    pub const ADMIN: UserLevel = UserLevel(10);

    const NAMED: [(&'static str, UserLevel); 4] = [
        ("noprivs", Self::NO_PRIVS),
        ("registered", Self::REGISTERED),
        ("superuser", Self::SUPERUSER),
        ("admin", Self::ADMIN),
    ];

    /// Create a level from a raw ordinal, clamped to [`UserLevel::ADMIN`].
    pub const fn new(ordinal: u8) -> Self {
        if ordinal > Self::ADMIN.0 {
            Self::ADMIN
        } else {
            UserLevel(ordinal)
        }
    }

    /// The raw ordinal.
    pub const fn ordinal(self) -> u8 {
        self.0
    }
}

impl FromStr for UserLevel {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        if let Some((_, level)) = Self::NAMED.iter().find(|(name, _)| *name == token) {
            return Ok(*level);
        }
        token
            .parse::<u8>()
            .map(UserLevel::new)
            .map_err(|_| ResolveError::UnknownLevel(s.trim().to_string()))
    }
}

impl fmt::Display for UserLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::NAMED.iter().find(|(_, level)| level == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Listener priority. Lower values run earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub i32);

impl Priority {
    /// -30
    pub const HIGHEST: Priority = Priority(-30);
    /// -20
    pub const HIGHER: Priority = Priority(-20);
    /// -10
    pub const HIGH: Priority = Priority(-10);
    /// 0, the neutral priority.
    pub const NORMAL: Priority = Priority(0);
    /// 10
    pub const LOW: Priority = Priority(10);
    /// 20
    pub const LOWER: Priority = Priority(20);
    /// 30
    pub const LOWEST: Priority = Priority(30);

    const NAMED: [(&'static str, Priority); 7] = [
        ("highest", Self::HIGHEST),
        ("higher", Self::HIGHER),
        ("high", Self::HIGH),
        ("normal", Self::NORMAL),
        ("low", Self::LOW),
        ("lower", Self::LOWER),
        ("lowest", Self::LOWEST),
    ];
}

impl FromStr for Priority {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if let Some((_, priority)) = Self::NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
        {
            return Ok(*priority);
        }
        token
            .parse::<i32>()
            .map(Priority)
            .map_err(|_| ResolveError::UnknownPriority(token.to_string()))
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Priority(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_levels_parse() {
        assert_eq!("admin".parse::<UserLevel>().unwrap(), UserLevel::ADMIN);
        assert_eq!("NoPrivs".parse::<UserLevel>().unwrap(), UserLevel::NO_PRIVS);
        assert_eq!("3".parse::<UserLevel>().unwrap().ordinal(), 3);
        assert_eq!("200".parse::<UserLevel>().unwrap(), UserLevel::ADMIN);
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert_eq!(
            "wizard".parse::<UserLevel>(),
            Err(ResolveError::UnknownLevel("wizard".into()))
        );
    }

    #[test]
    fn levels_are_ordered() {
        assert!(UserLevel::NO_PRIVS < UserLevel::REGISTERED);
        assert!(UserLevel::SUPERUSER < UserLevel::ADMIN);
        assert_eq!(UserLevel::ADMIN.to_string(), "admin");
    }

    #[test]
    fn priority_scale_is_centered_on_zero() {
        assert_eq!("highest".parse::<Priority>().unwrap(), Priority(-30));
        assert_eq!("normal".parse::<Priority>().unwrap(), Priority::default());
        assert_eq!("LOWEST".parse::<Priority>().unwrap(), Priority(30));
        assert_eq!("-5".parse::<Priority>().unwrap(), Priority(-5));
        assert!("soon".parse::<Priority>().is_err());
    }
}
