//! Upstream access checks consulted before the entity permission rules.

use crate::account::Account;
use crate::cache::Cacheability;
use crate::entity::EntityView;
use crate::permission::{Conjunction, PermissionLookup};
use crate::{AccessResult, Result};
use std::collections::BTreeMap;

/// Free-form create context (target parent, language, ...). Only upstream
/// checks interpret it.
pub type CreateContext = BTreeMap<String, String>;

/// A create access request.
#[derive(Debug, Clone, Copy)]
pub struct CreateRequest<'a> {
    pub entity_type_id: &'a str,
    pub bundle: Option<&'a str>,
    pub context: &'a CreateContext,
}

/// A pluggable access check.
///
/// Allowed and forbidden results are final; neutral hands over to the next
/// check.
pub trait AccessCheck: Send + Sync {
    fn check_access(
        &self,
        entity: &dyn EntityView,
        operation: &str,
        account: &Account,
        permissions: &dyn PermissionLookup,
    ) -> Result<AccessResult> {
        let _ = (entity, operation, account, permissions);
        Ok(AccessResult::neutral())
    }

    fn check_create_access(
        &self,
        request: &CreateRequest<'_>,
        account: &Account,
        permissions: &dyn PermissionLookup,
    ) -> Result<AccessResult> {
        let _ = (request, account, permissions);
        Ok(AccessResult::neutral())
    }
}

/// Ordered list of access checks. The first non-neutral result wins and
/// carries the cache dependencies of every check consulted before it.
#[derive(Default)]
pub struct DecisionChain {
    checks: Vec<Box<dyn AccessCheck>>,
}

impl DecisionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: impl AccessCheck + 'static) {
        self.checks.push(Box::new(check));
    }

    pub fn push_boxed(&mut self, check: Box<dyn AccessCheck>) {
        self.checks.push(check);
    }

    pub fn with(mut self, check: impl AccessCheck + 'static) -> Self {
        self.push(check);
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn check_access(
        &self,
        entity: &dyn EntityView,
        operation: &str,
        account: &Account,
        permissions: &dyn PermissionLookup,
    ) -> Result<AccessResult> {
        self.first_conclusive(|check| check.check_access(entity, operation, account, permissions))
    }

    pub fn check_create_access(
        &self,
        request: &CreateRequest<'_>,
        account: &Account,
        permissions: &dyn PermissionLookup,
    ) -> Result<AccessResult> {
        self.first_conclusive(|check| check.check_create_access(request, account, permissions))
    }

    fn first_conclusive<F>(&self, mut run: F) -> Result<AccessResult>
    where
        F: FnMut(&dyn AccessCheck) -> Result<AccessResult>,
    {
        let mut consulted = Cacheability::default();
        let mut reason = None;

        for check in &self.checks {
            let result = run(check.as_ref())?;
            if !result.is_neutral() {
                return Ok(result.with_cacheability(consulted));
            }
            consulted.merge(result.cacheability());
            if let Some(r) = result.reason() {
                reason = Some(r.to_string());
            }
        }

        let result = AccessResult::neutral().with_cacheability(consulted);
        Ok(match reason {
            Some(reason) => result.with_reason(reason),
            None => result,
        })
    }
}

/// Unsaved entities cannot be deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewEntityDeleteCheck;

impl AccessCheck for NewEntityDeleteCheck {
    fn check_access(
        &self,
        entity: &dyn EntityView,
        operation: &str,
        _account: &Account,
        _permissions: &dyn PermissionLookup,
    ) -> Result<AccessResult> {
        let result = AccessResult::forbidden_if(operation == "delete" && entity.is_new());
        Ok(if result.is_forbidden() {
            result.with_reason("The entity has not been saved.")
        } else {
            result
        })
    }
}

/// Grants every operation, including create, to holders of the entity
/// type's admin permission.
#[derive(Debug, Clone)]
pub struct AdminPermissionCheck {
    permission: String,
}

impl AdminPermissionCheck {
    pub fn new(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
        }
    }

    fn check(&self, account: &Account, permissions: &dyn PermissionLookup) -> Result<AccessResult> {
        AccessResult::allowed_if_has_permissions(
            permissions,
            account,
            std::slice::from_ref(&self.permission),
            Conjunction::Or,
        )
    }
}

impl AccessCheck for AdminPermissionCheck {
    fn check_access(
        &self,
        _entity: &dyn EntityView,
        _operation: &str,
        account: &Account,
        permissions: &dyn PermissionLookup,
    ) -> Result<AccessResult> {
        self.check(account, permissions)
    }

    fn check_create_access(
        &self,
        _request: &CreateRequest<'_>,
        account: &Account,
        permissions: &dyn PermissionLookup,
    ) -> Result<AccessResult> {
        self.check(account, permissions)
    }
}
