//! Access error types.

use thiserror::Error;

/// Access errors.
///
/// Decisions themselves are never errors: a denied check is an
/// [`AccessResult`](crate::AccessResult). These variants describe collaborator
/// failures that abort a single check.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The permission lookup collaborator failed.
    #[error("permission lookup failed: {0}")]
    Lookup(String),

    /// The effective account could not be resolved.
    #[error("account resolution failed: {0}")]
    Account(String),

    /// An upstream access check failed.
    #[error("upstream access check failed: {0}")]
    Upstream(String),

    /// Failed to parse a permission table.
    #[error("failed to parse permission table: {0}")]
    Parse(String),

    /// An I/O error occurred while reading a permission table.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
