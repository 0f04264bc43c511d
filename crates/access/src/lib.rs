//! Permission-string based access control for content entities.
//!
//! Given an entity, an operation name and an account, the
//! [`EntityAccessHandler`] produces an [`AccessResult`]: allowed, forbidden or
//! neutral, together with the [`Cacheability`] an external cache needs to
//! reuse the result safely.
//!
//! # Overview
//!
//! - **Upstream checks** ([`AccessCheck`], [`DecisionChain`]) run first and
//!   may decide outright, e.g. an admin permission or a custom module rule.
//! - **Entity permission rules** run when upstream stays neutral. They derive
//!   [`PermissionName`]s from the entity type, bundle, ownership and
//!   publication state, and ask the [`PermissionLookup`] whether the account
//!   holds any of them.
//! - **Cacheability** is stamped on every result: the entity's identity and
//!   revision always, the `user` context for owner-aware results.
//!
//! Neutral means "no rule matched"; callers deny unless a result is allowed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use access::{Account, EntityAccessHandler, EntitySnapshot, PermissionTable};
//!
//! let table = PermissionTable::default().grant("authenticated", ["update own article"]);
//! let handler = EntityAccessHandler::builder("article", Arc::new(table)).build();
//!
//! let entity = EntitySnapshot::new("article", Some("article"))
//!     .with_id("7")
//!     .with_owner(3);
//!
//! let result = handler.check_access(&entity, "update", &Account::new(3))?;
//! assert!(result.is_allowed());
//! assert!(result.cacheability().is_per_account());
//!
//! let result = handler.check_access(&entity, "update", &Account::new(4))?;
//! assert!(result.is_neutral());
//! # Ok::<(), access::Error>(())
//! ```

mod account;
mod cache;
mod chain;
mod entity;
mod error;
mod handler;
mod permission;
mod result;
mod table;

pub use account::{
    ANONYMOUS_ROLE, AUTHENTICATED_ROLE, Account, AccountId, AccountResolver, CurrentAccount,
};
pub use cache::{CONTEXT_USER, CONTEXT_USER_PERMISSIONS, Cacheability, EntityToken, MaxAge};
pub use chain::{
    AccessCheck, AdminPermissionCheck, CreateContext, CreateRequest, DecisionChain,
    NewEntityDeleteCheck,
};
pub use entity::{EntitySnapshot, EntityView, Ownable, Publishable};
pub use error::{Error, Result};
pub use handler::{EntityAccessHandler, EntityAccessHandlerBuilder};
pub use permission::{Conjunction, Ownership, PermissionLookup, PermissionName};
pub use result::{AccessResult, Decision};
pub use table::{AccountGrants, PermissionTable};
