//! Entity introspection.
//!
//! Access rules only need a narrow view of an entity: its type, bundle and
//! identity, plus two optional capabilities. Capabilities are queried with
//! [`EntityView::as_ownable`] and [`EntityView::as_publishable`]; an entity
//! type that has no owner or publication state simply keeps the default
//! `None`.

use crate::account::AccountId;
use crate::cache::MaxAge;

/// Read-only view of the entity being checked.
pub trait EntityView {
    /// Entity type identifier, e.g. `node`.
    fn entity_type_id(&self) -> &str;

    /// Bundle identifier, e.g. `article`.
    fn bundle(&self) -> Option<&str>;

    /// Storage identifier; `None` until the entity is first saved.
    fn id(&self) -> Option<&str>;

    fn revision_id(&self) -> Option<u64> {
        None
    }

    fn is_new(&self) -> bool {
        self.id().is_none()
    }

    fn as_ownable(&self) -> Option<&dyn Ownable> {
        None
    }

    fn as_publishable(&self) -> Option<&dyn Publishable> {
        None
    }

    /// Tags invalidated whenever the entity is saved.
    fn cache_tags(&self) -> Vec<String> {
        self.id()
            .map(|id| vec![format!("{}:{}", self.entity_type_id(), id)])
            .unwrap_or_default()
    }

    fn cache_max_age(&self) -> MaxAge {
        MaxAge::Permanent
    }
}

/// Entities that record an owning account.
pub trait Ownable {
    /// Owner of the entity, if one is set.
    fn owner_id(&self) -> Option<AccountId>;
}

/// Entities with a published/unpublished state.
pub trait Publishable {
    fn is_published(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OwnerField(Option<AccountId>);

impl Ownable for OwnerField {
    fn owner_id(&self) -> Option<AccountId> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatusField(bool);

impl Publishable for StatusField {
    fn is_published(&self) -> bool {
        self.0
    }
}

/// Owned snapshot of an entity's access-relevant fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySnapshot {
    entity_type: String,
    bundle: Option<String>,
    id: Option<String>,
    revision: Option<u64>,
    owner: Option<OwnerField>,
    status: Option<StatusField>,
}

impl EntitySnapshot {
    pub fn new(entity_type: impl Into<String>, bundle: Option<&str>) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.map(str::to_string),
            id: None,
            revision: None,
            owner: None,
            status: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Make the entity ownable and set its owner.
    pub fn with_owner(mut self, owner: u64) -> Self {
        self.owner = Some(OwnerField(Some(AccountId(owner))));
        self
    }

    /// Make the entity ownable without an owner.
    pub fn ownable(mut self) -> Self {
        self.owner.get_or_insert(OwnerField(None));
        self
    }

    pub fn published(mut self) -> Self {
        self.status = Some(StatusField(true));
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.status = Some(StatusField(false));
        self
    }
}

impl EntityView for EntitySnapshot {
    fn entity_type_id(&self) -> &str {
        &self.entity_type
    }

    fn bundle(&self) -> Option<&str> {
        self.bundle.as_deref()
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn revision_id(&self) -> Option<u64> {
        self.revision
    }

    fn as_ownable(&self) -> Option<&dyn Ownable> {
        self.owner.as_ref().map(|owner| owner as &dyn Ownable)
    }

    fn as_publishable(&self) -> Option<&dyn Publishable> {
        self.status.as_ref().map(|status| status as &dyn Publishable)
    }
}
