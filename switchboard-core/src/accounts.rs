//! Account and privilege resolution (external collaborator).

use crate::{event::Server, level::UserLevel};

/// Maps a message source to an account and the account to a privilege level.
pub trait Accounts: Send + Sync + 'static {
    /// Account logged in as `source` on `server`, if any.
    fn account(&self, server: &dyn Server, source: &str) -> Option<String>;

    /// Privilege level of `account`.
    fn access_level(&self, account: &str) -> UserLevel;

    /// Account and level for `source`; unauthenticated sources get
    /// [`UserLevel::NO_PRIVS`].
    fn resolve(&self, server: &dyn Server, source: &str) -> (Option<String>, UserLevel) {
        match self.account(server, source) {
            Some(account) => {
                let level = self.access_level(&account);
                (Some(account), level)
            }
            None => (None, UserLevel::NO_PRIVS),
        }
    }
}

/// Accounts backend that knows nobody.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAccounts;

impl Accounts for NoAccounts {
    fn account(&self, _server: &dyn Server, _source: &str) -> Option<String> {
        None
    }

    fn access_level(&self, _account: &str) -> UserLevel {
        UserLevel::NO_PRIVS
    }
}
