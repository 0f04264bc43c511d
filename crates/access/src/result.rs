//! Access results and their combination rules.

use crate::account::Account;
use crate::cache::{CONTEXT_USER, CONTEXT_USER_PERMISSIONS, Cacheability};
use crate::entity::EntityView;
use crate::permission::{Conjunction, PermissionLookup};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Forbidden,
    /// No rule applied. Callers treat this as a denial.
    Neutral,
}

/// A decision with its reason and cache dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResult {
    decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default)]
    cacheability: Cacheability,
}

impl AccessResult {
    fn with_decision(decision: Decision) -> Self {
        Self {
            decision,
            reason: None,
            cacheability: Cacheability::default(),
        }
    }

    pub fn allowed() -> Self {
        Self::with_decision(Decision::Allowed)
    }

    pub fn forbidden() -> Self {
        Self::with_decision(Decision::Forbidden)
    }

    pub fn neutral() -> Self {
        Self::with_decision(Decision::Neutral)
    }

    /// Allowed if `condition` holds, neutral otherwise.
    pub fn allowed_if(condition: bool) -> Self {
        if condition {
            Self::allowed()
        } else {
            Self::neutral()
        }
    }

    /// Forbidden if `condition` holds, neutral otherwise.
    pub fn forbidden_if(condition: bool) -> Self {
        if condition {
            Self::forbidden()
        } else {
            Self::neutral()
        }
    }

    /// Allowed if the account holds any (`Or`) or all (`And`) of
    /// `permissions`, neutral otherwise. An empty list is never a grant.
    ///
    /// The result always varies by permission set.
    pub fn allowed_if_has_permissions(
        lookup: &dyn PermissionLookup,
        account: &Account,
        permissions: &[String],
        conjunction: Conjunction,
    ) -> Result<Self> {
        let granted = !permissions.is_empty()
            && match conjunction {
                Conjunction::Or => lookup.has_any_permission(account, permissions)?,
                Conjunction::And => lookup.has_all_permissions(account, permissions)?,
            };

        let mut result = Self::allowed_if(granted);
        if result.is_neutral() && !permissions.is_empty() {
            let required = permissions
                .iter()
                .map(|p| format!("'{p}'"))
                .collect::<Vec<_>>()
                .join(format!(" {conjunction} ").as_str());
            result = result.with_reason(format!(
                "The following permissions are required: {required}."
            ));
        }
        Ok(result.cache_per_permissions())
    }

    /// Attach a reason. Allowed results carry no reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        if !self.is_allowed() {
            self.reason = Some(reason.into());
        }
        self
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn cacheability(&self) -> &Cacheability {
        &self.cacheability
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allowed
    }

    pub fn is_forbidden(&self) -> bool {
        self.decision == Decision::Forbidden
    }

    pub fn is_neutral(&self) -> bool {
        self.decision == Decision::Neutral
    }

    /// Vary the result by account.
    pub fn cache_per_account(mut self) -> Self {
        self.cacheability.add_context(CONTEXT_USER);
        self
    }

    /// Vary the result by permission set.
    pub fn cache_per_permissions(mut self) -> Self {
        self.cacheability.add_context(CONTEXT_USER_PERMISSIONS);
        self
    }

    /// Invalidate the result whenever `entity` changes.
    pub fn add_entity_dependency(mut self, entity: &dyn EntityView) -> Self {
        self.cacheability.add_entity(entity);
        self
    }

    /// Merge another result's cache dependencies into this one.
    pub fn inherit_cacheability(mut self, other: &AccessResult) -> Self {
        self.cacheability.merge(&other.cacheability);
        self
    }

    pub(crate) fn with_cacheability(mut self, cacheability: Cacheability) -> Self {
        self.cacheability.merge(&cacheability);
        self
    }

    /// Forbidden if either is forbidden, else allowed if either is allowed,
    /// else neutral.
    pub fn or_if(self, other: AccessResult) -> Self {
        let decision = match (self.decision, other.decision) {
            (Decision::Forbidden, _) | (_, Decision::Forbidden) => Decision::Forbidden,
            (Decision::Allowed, _) | (_, Decision::Allowed) => Decision::Allowed,
            _ => Decision::Neutral,
        };
        self.combine(other, decision)
    }

    /// Forbidden if either is forbidden, else allowed only if both are
    /// allowed, else neutral.
    pub fn and_if(self, other: AccessResult) -> Self {
        let decision = match (self.decision, other.decision) {
            (Decision::Forbidden, _) | (_, Decision::Forbidden) => Decision::Forbidden,
            (Decision::Allowed, Decision::Allowed) => Decision::Allowed,
            _ => Decision::Neutral,
        };
        self.combine(other, decision)
    }

    fn combine(self, other: AccessResult, decision: Decision) -> Self {
        // A forbidden left operand decides alone; the right one is irrelevant.
        let left_decides = self.is_forbidden() && !other.is_forbidden();

        let reason = match decision {
            Decision::Allowed => None,
            Decision::Forbidden if self.is_forbidden() => self.reason.or(other.reason),
            Decision::Forbidden => other.reason,
            Decision::Neutral if self.is_neutral() => self.reason.or(other.reason),
            Decision::Neutral => other.reason,
        };

        let mut cacheability = self.cacheability;
        if !left_decides {
            cacheability.merge(&other.cacheability);
        }

        Self {
            decision,
            reason,
            cacheability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MaxAge;

    struct Holds(&'static [&'static str]);

    impl PermissionLookup for Holds {
        fn has_permission(&self, _account: &Account, permission: &str) -> Result<bool> {
            Ok(self.0.contains(&permission))
        }
    }

    fn perms(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_or_if_truth_table() {
        use Decision::*;
        let cases = [
            (Allowed, Allowed, Allowed),
            (Allowed, Neutral, Allowed),
            (Neutral, Allowed, Allowed),
            (Neutral, Neutral, Neutral),
            (Allowed, Forbidden, Forbidden),
            (Forbidden, Allowed, Forbidden),
            (Neutral, Forbidden, Forbidden),
        ];
        for (a, b, expected) in cases {
            let result = AccessResult::with_decision(a).or_if(AccessResult::with_decision(b));
            assert_eq!(result.decision(), expected, "{a:?} or {b:?}");
        }
    }

    #[test]
    fn test_and_if_truth_table() {
        use Decision::*;
        let cases = [
            (Allowed, Allowed, Allowed),
            (Allowed, Neutral, Neutral),
            (Neutral, Allowed, Neutral),
            (Neutral, Neutral, Neutral),
            (Allowed, Forbidden, Forbidden),
            (Forbidden, Neutral, Forbidden),
        ];
        for (a, b, expected) in cases {
            let result = AccessResult::with_decision(a).and_if(AccessResult::with_decision(b));
            assert_eq!(result.decision(), expected, "{a:?} and {b:?}");
        }
    }

    #[test]
    fn test_forbidden_left_drops_right_cacheability() {
        let left = AccessResult::forbidden().with_reason("locked");
        let right = AccessResult::allowed().cache_per_account();

        let result = left.or_if(right);
        assert!(result.is_forbidden());
        assert_eq!(result.reason(), Some("locked"));
        assert!(!result.cacheability().is_per_account());
    }

    #[test]
    fn test_or_if_merges_cacheability() {
        let mut left = AccessResult::neutral().cache_per_permissions();
        left.cacheability.max_age = MaxAge::Seconds(60);
        let right = AccessResult::allowed().cache_per_account();

        let result = left.or_if(right);
        assert!(result.is_allowed());
        assert_eq!(result.reason(), None);
        assert!(result.cacheability().is_per_account());
        assert_eq!(result.cacheability().max_age, MaxAge::Seconds(60));
    }

    #[test]
    fn test_allowed_result_has_no_reason() {
        assert_eq!(AccessResult::allowed().with_reason("because").reason(), None);
        assert_eq!(
            AccessResult::neutral().with_reason("because").reason(),
            Some("because")
        );
    }

    #[test]
    fn test_allowed_if_has_permissions_or() {
        let lookup = Holds(&["create page node"]);
        let account = Account::new(2);

        let result = AccessResult::allowed_if_has_permissions(
            &lookup,
            &account,
            &perms(&["create node", "create page node"]),
            Conjunction::Or,
        )
        .unwrap();
        assert!(result.is_allowed());
        assert!(result.cacheability().contexts.contains(CONTEXT_USER_PERMISSIONS));
        assert!(!result.cacheability().is_per_account());
    }

    #[test]
    fn test_allowed_if_has_permissions_reason() {
        let lookup = Holds(&["create node"]);
        let account = Account::new(2);

        let result = AccessResult::allowed_if_has_permissions(
            &lookup,
            &account,
            &perms(&["create node", "administer node"]),
            Conjunction::And,
        )
        .unwrap();
        assert!(result.is_neutral());
        assert_eq!(
            result.reason(),
            Some("The following permissions are required: 'create node' AND 'administer node'.")
        );
    }

    #[test]
    fn test_empty_permission_list_is_neutral() {
        let lookup = Holds(&[]);
        let account = Account::new(2);
        for conjunction in [Conjunction::Or, Conjunction::And] {
            let result =
                AccessResult::allowed_if_has_permissions(&lookup, &account, &[], conjunction)
                    .unwrap();
            assert!(result.is_neutral());
            assert_eq!(result.reason(), None);
        }
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(AccessResult::allowed().cache_per_account()).unwrap();
        assert_eq!(json["decision"], "allowed");
        assert_eq!(json["cacheability"]["contexts"][0], "user");
        assert!(json.get("reason").is_none());
    }
}
