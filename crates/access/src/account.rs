//! Acting accounts and account resolution.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role every anonymous account implicitly holds.
pub const ANONYMOUS_ROLE: &str = "anonymous";

/// Role every signed-in account implicitly holds.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Stable account identifier.
///
/// Ownership checks compare identifiers with strict equality: an entity owned
/// by `AccountId(3)` matches only the account whose id is `AccountId(3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl AccountId {
    pub const ANONYMOUS: Self = Self(0);

    pub fn is_anonymous(self) -> bool {
        self == Self::ANONYMOUS
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The principal an access check is performed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    #[serde(default)]
    roles: BTreeSet<String>,
}

impl Account {
    pub fn new(id: u64) -> Self {
        Self::with_id(AccountId(id))
    }

    pub fn with_id(id: AccountId) -> Self {
        Self {
            id,
            roles: BTreeSet::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::with_id(AccountId::ANONYMOUS)
    }

    /// Attach session roles to the account.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_anonymous()
    }

    /// Roles held by this account, including the implicit
    /// anonymous/authenticated role.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        let implicit = if self.is_anonymous() {
            ANONYMOUS_ROLE
        } else {
            AUTHENTICATED_ROLE
        };
        std::iter::once(implicit).chain(self.roles.iter().map(String::as_str))
    }
}

/// Resolves the account a check is actually evaluated for.
///
/// Implementations may substitute a different identity, for example to run a
/// check as the current session user when no account was given.
pub trait AccountResolver: Send + Sync {
    fn resolve<'a>(&'a self, account: Option<&'a Account>) -> Result<&'a Account>;
}

/// Falls back to a fixed current account when none is supplied.
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    account: Account,
}

impl CurrentAccount {
    pub fn new(account: Account) -> Self {
        Self { account }
    }
}

impl Default for CurrentAccount {
    fn default() -> Self {
        Self::new(Account::anonymous())
    }
}

impl AccountResolver for CurrentAccount {
    fn resolve<'a>(&'a self, account: Option<&'a Account>) -> Result<&'a Account> {
        Ok(account.unwrap_or(&self.account))
    }
}
