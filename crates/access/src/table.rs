//! In-memory permission table loaded from TOML.

use crate::account::{Account, AccountId};
use crate::permission::PermissionLookup;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Role grants and account role assignments.
///
/// Permissions are only ever held through roles, so a lookup depends on the
/// account's role set and nothing else about its identity.
///
/// ```toml
/// admin_role = "administrator"
///
/// [roles]
/// authenticated = ["view any article"]
/// editor = ["update own article"]
///
/// [accounts.3]
/// roles = ["editor"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionTable {
    /// Role that holds every permission.
    #[serde(default)]
    pub admin_role: Option<String>,

    /// Permissions granted to each role.
    #[serde(default)]
    pub roles: BTreeMap<String, BTreeSet<String>>,

    /// Role assignments keyed by account id.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountGrants>,
}

/// Roles assigned to a single account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountGrants {
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl PermissionTable {
    /// Load a permission table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a permission table from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Grant `permissions` to `role`.
    pub fn grant<I, S>(mut self, role: &str, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .entry(role.to_string())
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Assign `role` to the account `id`.
    pub fn assign(mut self, id: AccountId, role: &str) -> Self {
        self.accounts
            .entry(id.to_string())
            .or_default()
            .roles
            .insert(role.to_string());
        self
    }

    fn grants(&self, id: AccountId) -> Option<&AccountGrants> {
        self.accounts.get(&id.to_string())
    }

    /// Session roles plus any roles the table assigns to the account.
    fn roles_of<'a>(&'a self, account: &'a Account) -> impl Iterator<Item = &'a str> {
        let assigned = self
            .grants(account.id())
            .into_iter()
            .flat_map(|grants| grants.roles.iter().map(String::as_str));
        account.roles().chain(assigned)
    }
}

impl PermissionLookup for PermissionTable {
    fn has_permission(&self, account: &Account, permission: &str) -> Result<bool> {
        let held = self.roles_of(account).any(|role| {
            self.admin_role.as_deref() == Some(role)
                || self
                    .roles
                    .get(role)
                    .is_some_and(|permissions| permissions.contains(permission))
        });
        Ok(held)
    }
}
