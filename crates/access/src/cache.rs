//! Cacheability metadata attached to access results.
//!
//! The engine never stores results. It describes, for an external cache
//! store, which inputs a result depends on:
//!
//! - **contexts** name request-level variations the cache key must include
//!   (`user` for per-account results, `user.permissions` for results that
//!   vary with the account's permission set),
//! - **tags** and **entity tokens** name data whose mutation invalidates the
//!   result,
//! - **max-age** bounds how long the result stays valid.

use crate::entity::EntityView;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Cache context for results that differ per account.
pub const CONTEXT_USER: &str = "user";

/// Cache context for results that differ per permission set.
pub const CONTEXT_USER_PERMISSIONS: &str = "user.permissions";

/// How long a result may be cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxAge {
    #[default]
    Permanent,
    Seconds(u32),
}

impl MaxAge {
    /// The stricter of two ages.
    pub fn min(self, other: MaxAge) -> MaxAge {
        match (self, other) {
            (MaxAge::Permanent, age) | (age, MaxAge::Permanent) => age,
            (MaxAge::Seconds(a), MaxAge::Seconds(b)) => MaxAge::Seconds(a.min(b)),
        }
    }
}

/// Identity and version of an entity a result depends on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityToken {
    pub entity_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

/// Cache dependencies of an access result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cacheability {
    #[serde(default)]
    pub contexts: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub entities: BTreeSet<EntityToken>,
    #[serde(default)]
    pub max_age: MaxAge,
}

impl Cacheability {
    pub fn add_context(&mut self, context: impl Into<String>) {
        self.contexts.insert(context.into());
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Whether the cache key must include the account identity.
    pub fn is_per_account(&self) -> bool {
        self.contexts.contains(CONTEXT_USER)
    }

    /// Depend on an entity: its cache tags, its identity and revision, and
    /// its max-age. Unsaved entities contribute only their max-age.
    pub fn add_entity(&mut self, entity: &dyn EntityView) {
        self.tags.extend(entity.cache_tags());
        if let Some(id) = entity.id() {
            self.entities.insert(EntityToken {
                entity_type: entity.entity_type_id().to_string(),
                id: id.to_string(),
                revision: entity.revision_id(),
            });
        }
        self.max_age = self.max_age.min(entity.cache_max_age());
    }

    /// Union of both dependency sets; the stricter max-age wins.
    pub fn merge(&mut self, other: &Cacheability) {
        self.contexts.extend(other.contexts.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
        self.entities.extend(other.entities.iter().cloned());
        self.max_age = self.max_age.min(other.max_age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntitySnapshot;

    #[test]
    fn test_max_age_min() {
        assert_eq!(MaxAge::Permanent.min(MaxAge::Seconds(30)), MaxAge::Seconds(30));
        assert_eq!(MaxAge::Seconds(5).min(MaxAge::Seconds(30)), MaxAge::Seconds(5));
        assert_eq!(MaxAge::Permanent.min(MaxAge::Permanent), MaxAge::Permanent);
    }

    #[test]
    fn test_add_entity() {
        let entity = EntitySnapshot::new("node", Some("article"))
            .with_id("5")
            .with_revision(12);
        let mut cacheability = Cacheability::default();
        cacheability.add_entity(&entity);

        assert!(cacheability.tags.contains("node:5"));
        let token = cacheability.entities.iter().next().unwrap();
        assert_eq!(token.id, "5");
        assert_eq!(token.revision, Some(12));
    }

    #[test]
    fn test_unsaved_entity_has_no_token() {
        let entity = EntitySnapshot::new("node", Some("article"));
        let mut cacheability = Cacheability::default();
        cacheability.add_entity(&entity);

        assert!(cacheability.tags.is_empty());
        assert!(cacheability.entities.is_empty());
    }

    #[test]
    fn test_merge() {
        let mut a = Cacheability::default();
        a.add_context(CONTEXT_USER_PERMISSIONS);
        a.max_age = MaxAge::Seconds(60);

        let mut b = Cacheability::default();
        b.add_context(CONTEXT_USER);
        b.add_tag("node:1");
        b.max_age = MaxAge::Seconds(10);

        a.merge(&b);
        assert!(a.is_per_account());
        assert!(a.contexts.contains(CONTEXT_USER_PERMISSIONS));
        assert!(a.tags.contains("node:1"));
        assert_eq!(a.max_age, MaxAge::Seconds(10));
    }
}
