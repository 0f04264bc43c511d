//! Permission names and the permission lookup boundary.
//!
//! Permission names follow a fixed grammar:
//!
//! ```text
//! {operation}[ own| any][ unpublished][ {bundle}] {entity_type}
//! ```
//!
//! e.g. `view own unpublished article`, `update any page node`,
//! `create page node`.

use crate::account::Account;
use crate::entity::EntityView;
use crate::Result;
use std::fmt;

/// Operation whose permission gains the unpublished qualifier.
pub(crate) const VIEW: &str = "view";

/// Resolves whether an account holds named permissions.
pub trait PermissionLookup: Send + Sync {
    fn has_permission(&self, account: &Account, permission: &str) -> Result<bool>;

    /// True if the account holds at least one of `permissions`.
    fn has_any_permission(&self, account: &Account, permissions: &[String]) -> Result<bool> {
        for permission in permissions {
            if self.has_permission(account, permission)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if the account holds every one of `permissions`.
    fn has_all_permissions(&self, account: &Account, permissions: &[String]) -> Result<bool> {
        for permission in permissions {
            if !self.has_permission(account, permission)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// How a list of permissions combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    Or,
    And,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::Or => f.write_str("OR"),
            Conjunction::And => f.write_str("AND"),
        }
    }
}

/// Ownership qualifier of an owner-aware permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Own,
    Any,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::Own => f.write_str("own"),
            Ownership::Any => f.write_str("any"),
        }
    }
}

/// A permission name built from the grammar above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionName<'a> {
    operation: &'a str,
    ownership: Option<Ownership>,
    unpublished: bool,
    bundle: Option<&'a str>,
    entity_type: &'a str,
}

impl<'a> PermissionName<'a> {
    pub fn new(operation: &'a str, entity_type: &'a str) -> Self {
        Self {
            operation,
            ownership: None,
            unpublished: false,
            bundle: None,
            entity_type,
        }
    }

    pub fn ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = Some(ownership);
        self
    }

    pub fn unpublished(mut self, unpublished: bool) -> Self {
        self.unpublished = unpublished;
        self
    }

    pub fn bundle(mut self, bundle: &'a str) -> Self {
        self.bundle = Some(bundle);
        self
    }
}

impl fmt::Display for PermissionName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation)?;
        if let Some(ownership) = self.ownership {
            write!(f, " {ownership}")?;
        }
        if self.unpublished {
            f.write_str(" unpublished")?;
        }
        if let Some(bundle) = self.bundle {
            write!(f, " {bundle}")?;
        }
        write!(f, " {}", self.entity_type)
    }
}

/// Whether `operation` on `entity` uses the unpublished permission variants:
/// only `view` of a publishable entity that is currently unpublished.
pub(crate) fn is_unpublished_view(entity: &dyn EntityView, operation: &str) -> bool {
    operation == VIEW
        && entity
            .as_publishable()
            .is_some_and(|publishable| !publishable.is_published())
}
