//! Entity access handler.
//!
//! Access is decided in two phases. The upstream [`DecisionChain`] runs
//! first; if it allows or forbids, that is the decision. If it stays neutral,
//! the handler derives permission names from the entity and grants access
//! when the account holds any of them:
//!
//! | entity          | account  | candidates                                                  |
//! |-----------------|----------|-------------------------------------------------------------|
//! | not ownable     | any      | `{op} {type}`, `{op} {bundle} {type}`                       |
//! | ownable         | owner    | `{op} own\|any {type}`, `{op} own\|any {bundle} {type}`     |
//! | ownable         | other    | `{op} any {type}`, `{op} any {bundle} {type}`               |
//!
//! `view` of an unpublished entity inserts `unpublished` after the ownership
//! qualifier. Every result depends on the entity, and owner-aware results
//! vary per account.

use crate::account::{Account, AccountResolver, CurrentAccount};
use crate::chain::{
    AccessCheck, AdminPermissionCheck, CreateContext, CreateRequest, DecisionChain,
    NewEntityDeleteCheck,
};
use crate::entity::EntityView;
use crate::permission::{
    Conjunction, Ownership, PermissionLookup, PermissionName, is_unpublished_view,
};
use crate::{AccessResult, Result};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Access control for one entity type.
pub struct EntityAccessHandler {
    entity_type_id: String,
    permissions: Arc<dyn PermissionLookup>,
    upstream: DecisionChain,
    resolver: Box<dyn AccountResolver>,
}

/// Builder for [`EntityAccessHandler`].
pub struct EntityAccessHandlerBuilder {
    entity_type_id: String,
    permissions: Arc<dyn PermissionLookup>,
    admin_permission: Option<String>,
    checks: Vec<Box<dyn AccessCheck>>,
    resolver: Box<dyn AccountResolver>,
}

impl EntityAccessHandlerBuilder {
    /// Permission that grants every operation on the entity type.
    pub fn admin_permission(mut self, permission: impl Into<String>) -> Self {
        self.admin_permission = Some(permission.into());
        self
    }

    /// Append an upstream check. Checks run in insertion order, after the
    /// built-in ones.
    pub fn check(mut self, check: impl AccessCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn resolver(mut self, resolver: impl AccountResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn build(self) -> EntityAccessHandler {
        let mut upstream = DecisionChain::new().with(NewEntityDeleteCheck);
        if let Some(permission) = self.admin_permission {
            upstream.push(AdminPermissionCheck::new(permission));
        }
        for check in self.checks {
            upstream.push_boxed(check);
        }

        EntityAccessHandler {
            entity_type_id: self.entity_type_id,
            permissions: self.permissions,
            upstream,
            resolver: self.resolver,
        }
    }
}

impl EntityAccessHandler {
    pub fn builder(
        entity_type_id: impl Into<String>,
        permissions: Arc<dyn PermissionLookup>,
    ) -> EntityAccessHandlerBuilder {
        EntityAccessHandlerBuilder {
            entity_type_id: entity_type_id.into(),
            permissions,
            admin_permission: None,
            checks: Vec::new(),
            resolver: Box::new(CurrentAccount::default()),
        }
    }

    pub fn entity_type_id(&self) -> &str {
        &self.entity_type_id
    }

    /// Check `operation` on `entity`, falling back to the resolver's current
    /// account when `account` is `None`.
    pub fn access(
        &self,
        entity: &dyn EntityView,
        operation: &str,
        account: Option<&Account>,
    ) -> Result<AccessResult> {
        let account = self.resolver.resolve(account)?;
        self.check_access(entity, operation, account)
    }

    /// Check create access, falling back to the resolver's current account
    /// when `account` is `None`.
    pub fn create_access(
        &self,
        account: Option<&Account>,
        context: &CreateContext,
        bundle: Option<&str>,
    ) -> Result<AccessResult> {
        let account = self.resolver.resolve(account)?;
        self.check_create_access(account, context, bundle)
    }

    /// Upstream chain first, then the entity permission rules.
    pub fn check_access(
        &self,
        entity: &dyn EntityView,
        operation: &str,
        account: &Account,
    ) -> Result<AccessResult> {
        let account = self.resolver.resolve(Some(account))?;
        if entity.entity_type_id() != self.entity_type_id {
            warn!(
                handler = %self.entity_type_id,
                entity_type = %entity.entity_type_id(),
                "entity checked by a handler for another entity type"
            );
        }

        let upstream = self
            .upstream
            .check_access(entity, operation, account, self.permissions.as_ref())?;

        let result = if upstream.is_neutral() {
            debug!(
                entity_type = %entity.entity_type_id(),
                operation,
                account = %account.id(),
                "upstream access inconclusive, checking entity permissions"
            );
            let own = if entity.as_ownable().is_some() {
                self.check_entity_owner_permissions(entity, operation, account)?
            } else {
                self.check_entity_permissions(entity, operation, account)?
            };
            own.inherit_cacheability(&upstream)
        } else {
            debug!(
                entity_type = %entity.entity_type_id(),
                operation,
                account = %account.id(),
                decision = ?upstream.decision(),
                "upstream access conclusive"
            );
            upstream
        };

        Ok(result.add_entity_dependency(entity))
    }

    /// Type and bundle permissions, for entities without an owner.
    pub fn check_entity_permissions(
        &self,
        entity: &dyn EntityView,
        operation: &str,
        account: &Account,
    ) -> Result<AccessResult> {
        let unpublished = is_unpublished_view(entity, operation);
        let entity_type = entity.entity_type_id();

        let mut names = vec![PermissionName::new(operation, entity_type).unpublished(unpublished)];
        if let Some(bundle) = given(entity.bundle()) {
            names.push(
                PermissionName::new(operation, entity_type)
                    .unpublished(unpublished)
                    .bundle(bundle),
            );
        }

        self.allowed_if_any(account, &names)
    }

    /// `own`/`any` type and bundle permissions. The result varies per
    /// account.
    pub fn check_entity_owner_permissions(
        &self,
        entity: &dyn EntityView,
        operation: &str,
        account: &Account,
    ) -> Result<AccessResult> {
        let unpublished = is_unpublished_view(entity, operation);
        let entity_type = entity.entity_type_id();

        let is_owner = entity
            .as_ownable()
            .and_then(|ownable| ownable.owner_id())
            .is_some_and(|owner| owner == account.id());
        let qualifiers: &[Ownership] = if is_owner {
            &[Ownership::Own, Ownership::Any]
        } else {
            &[Ownership::Any]
        };

        let name = |ownership: Ownership| {
            PermissionName::new(operation, entity_type)
                .ownership(ownership)
                .unpublished(unpublished)
        };
        let mut names: Vec<_> = qualifiers.iter().map(|&ownership| name(ownership)).collect();
        if let Some(bundle) = given(entity.bundle()) {
            names.extend(qualifiers.iter().map(|&ownership| name(ownership).bundle(bundle)));
        }

        Ok(self.allowed_if_any(account, &names)?.cache_per_account())
    }

    /// Upstream create chain first, then the admin and create permissions.
    pub fn check_create_access(
        &self,
        account: &Account,
        context: &CreateContext,
        bundle: Option<&str>,
    ) -> Result<AccessResult> {
        let account = self.resolver.resolve(Some(account))?;
        let request = CreateRequest {
            entity_type_id: &self.entity_type_id,
            bundle,
            context,
        };

        let upstream = self
            .upstream
            .check_create_access(&request, account, self.permissions.as_ref())?;
        if !upstream.is_neutral() {
            debug!(
                entity_type = %self.entity_type_id,
                account = %account.id(),
                decision = ?upstream.decision(),
                "upstream create access conclusive"
            );
            return Ok(upstream);
        }

        let entity_type = self.entity_type_id.as_str();
        let mut names = vec![
            PermissionName::new("administer", entity_type),
            PermissionName::new("create", entity_type),
        ];
        if let Some(bundle) = given(bundle) {
            names.push(PermissionName::new("create", entity_type).bundle(bundle));
        }

        Ok(self.allowed_if_any(account, &names)?.inherit_cacheability(&upstream))
    }

    fn allowed_if_any(
        &self,
        account: &Account,
        names: &[PermissionName<'_>],
    ) -> Result<AccessResult> {
        let candidates: Vec<String> = names.iter().map(ToString::to_string).collect();
        trace!(account = %account.id(), ?candidates, "checking permissions");
        AccessResult::allowed_if_has_permissions(
            self.permissions.as_ref(),
            account,
            &candidates,
            Conjunction::Or,
        )
    }
}

impl std::fmt::Debug for EntityAccessHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityAccessHandler")
            .field("entity_type_id", &self.entity_type_id)
            .field("upstream_checks", &self.upstream.len())
            .finish_non_exhaustive()
    }
}

/// An empty bundle id counts as no bundle.
fn given(bundle: Option<&str>) -> Option<&str> {
    bundle.filter(|bundle| !bundle.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountId, EntitySnapshot, PermissionTable};

    fn handler(table: PermissionTable) -> EntityAccessHandler {
        EntityAccessHandler::builder("node", Arc::new(table)).build()
    }

    /// Records every permission name asked about.
    #[derive(Default)]
    struct Recorder(std::sync::Mutex<Vec<String>>);

    impl PermissionLookup for Recorder {
        fn has_permission(&self, _account: &Account, permission: &str) -> Result<bool> {
            self.0.lock().unwrap().push(permission.to_string());
            Ok(false)
        }
    }

    fn candidates(entity: &EntitySnapshot, operation: &str, account: &Account) -> Vec<String> {
        let recorder = Arc::new(Recorder::default());
        let handler = EntityAccessHandler::builder("node", recorder.clone()).build();
        handler.check_access(entity, operation, account).unwrap();
        recorder.0.lock().unwrap().clone()
    }

    #[test]
    fn test_type_only_candidates() {
        let entity = EntitySnapshot::new("node", Some("page")).with_id("1").unpublished();
        assert_eq!(
            candidates(&entity, "view", &Account::new(1)),
            vec!["view unpublished node", "view unpublished page node"]
        );
        assert_eq!(
            candidates(&entity, "update", &Account::new(1)),
            vec!["update node", "update page node"]
        );
    }

    #[test]
    fn test_owner_candidates() {
        let entity = EntitySnapshot::new("node", Some("page")).with_id("1").with_owner(3);
        assert_eq!(
            candidates(&entity, "update", &Account::new(3)),
            vec![
                "update own node",
                "update any node",
                "update own page node",
                "update any page node"
            ]
        );
        assert_eq!(
            candidates(&entity, "update", &Account::new(4)),
            vec!["update any node", "update any page node"]
        );
    }

    #[test]
    fn test_missing_bundle_skips_bundle_candidates() {
        let entity = EntitySnapshot::new("node", None).with_id("1").with_owner(3);
        assert_eq!(
            candidates(&entity, "delete", &Account::new(3)),
            vec!["delete own node", "delete any node"]
        );

        let entity = EntitySnapshot::new("node", None).with_id("1");
        assert_eq!(candidates(&entity, "delete", &Account::new(3)), vec!["delete node"]);
    }

    #[test]
    fn test_unset_owner_never_matches() {
        let entity = EntitySnapshot::new("node", Some("page")).with_id("1").ownable();
        assert_eq!(
            candidates(&entity, "view", &Account::anonymous()),
            vec!["view any node", "view any page node"]
        );
    }

    #[test]
    fn test_owner_rule_is_per_account() {
        let table = PermissionTable::default()
            .grant("editor", ["update own node"])
            .assign(AccountId(3), "editor");
        let entity = EntitySnapshot::new("node", Some("page")).with_id("1").with_owner(3);

        let result = handler(table).check_access(&entity, "update", &Account::new(3)).unwrap();
        assert!(result.is_allowed());
        assert!(result.cacheability().is_per_account());
        assert!(result.cacheability().tags.contains("node:1"));
    }

    #[test]
    fn test_type_rule_is_not_per_account() {
        let table = PermissionTable::default().grant("authenticated", ["delete node"]);
        let entity = EntitySnapshot::new("node", Some("page")).with_id("1");

        let result = handler(table).check_access(&entity, "delete", &Account::new(3)).unwrap();
        assert!(result.is_allowed());
        assert!(!result.cacheability().is_per_account());
    }

    #[test]
    fn test_delete_unsaved_forbidden_even_with_permission() {
        let table = PermissionTable::default().grant("authenticated", ["delete node"]);
        let entity = EntitySnapshot::new("node", Some("page"));

        let result = handler(table).check_access(&entity, "delete", &Account::new(3)).unwrap();
        assert!(result.is_forbidden());
    }

    #[test]
    fn test_create_candidates() {
        let recorder = Arc::new(Recorder::default());
        let handler = EntityAccessHandler::builder("node", recorder.clone()).build();
        let result = handler
            .check_create_access(&Account::new(1), &CreateContext::new(), Some("page"))
            .unwrap();

        assert!(result.is_neutral());
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["administer node", "create node", "create page node"]
        );
    }

    #[test]
    fn test_create_skips_empty_bundle() {
        let recorder = Arc::new(Recorder::default());
        let handler = EntityAccessHandler::builder("node", recorder.clone()).build();
        handler
            .check_create_access(&Account::new(1), &CreateContext::new(), Some(""))
            .unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec!["administer node", "create node"]);
    }

    #[test]
    fn test_empty_entity_bundle_skips_bundle_candidates() {
        let entity = EntitySnapshot::new("node", Some("")).with_id("1");
        assert_eq!(candidates(&entity, "update", &Account::new(1)), vec!["update node"]);

        let entity = entity.with_owner(1);
        assert_eq!(
            candidates(&entity, "update", &Account::new(1)),
            vec!["update own node", "update any node"]
        );
    }

    #[test]
    fn test_debug_names_entity_type() {
        let handler = handler(PermissionTable::default());
        let debug = format!("{handler:?}");
        assert!(debug.contains("EntityAccessHandler"));
        assert!(debug.contains("\"node\""));
    }

    #[test]
    fn test_access_uses_current_account() {
        let table = PermissionTable::default().grant("reviewer", ["view node"]);
        let handler = EntityAccessHandler::builder("node", Arc::new(table))
            .resolver(CurrentAccount::new(Account::new(9).with_roles(["reviewer"])))
            .build();
        let entity = EntitySnapshot::new("node", Some("page")).with_id("1");

        assert!(handler.access(&entity, "view", None).unwrap().is_allowed());
        assert!(handler.access(&entity, "view", Some(&Account::new(2))).unwrap().is_neutral());
    }
}
