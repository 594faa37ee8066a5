//! Error taxonomy for the mutation engine, temporal views, path operations,
//! and the repository contract.
//!
//! The mutation engine either completes a mutation fully or raises one of
//! these; callers never observe a partially-applied cascade.

use chrono::{DateTime, Utc};

use crate::id::{Locator, Uid};

/// Context attached to a `GraphError::NotFound`, enough to diagnose which
/// uid/locator/timestamp lookup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundDetail {
    Uid(Uid),
    Locator(Locator),
    UidAt(Uid, DateTime<Utc>),
}

impl std::fmt::Display for NotFoundDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundDetail::Uid(uid) => write!(f, "uid {uid} has no active version"),
            NotFoundDetail::Locator(loc) => write!(f, "locator {loc} does not exist"),
            NotFoundDetail::UidAt(uid, t) => write!(f, "uid {uid} has no version active at {t}"),
        }
    }
}

/// Errors raised by the abstract repository contract; treated
/// as fatal for the mutation currently in progress.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("duplicate locator {0}")]
    DuplicateLocator(Locator),
    #[error("repository has no entry for {0}")]
    NotFound(Locator),
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Why a user-constructed component's subgraph failed validation
/// ("Validation hook").
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("component subgraph has no nodes")]
    Empty,
    #[error("component subgraph is not weakly connected")]
    Disconnected,
    #[error("component subgraph contains a directed cycle")]
    Cyclic,
    #[error("edge {0} references an endpoint outside the declared node set")]
    LeafNotInNodeSet(Locator),
}

/// Top-level error type surfaced by the mutation engine, temporal views,
/// and path operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The requested uid/locator has no matching (active) version.
    #[error("not found: {0}")]
    NotFound(NotFoundDetail),

    /// A referenced endpoint, uid, or component subgraph failed validation
    /// before any mutation was applied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A component validation failure, carrying the precise constraint
    /// that was violated.
    #[error("invalid component: {0}")]
    InvalidComponent(#[from] ValidationError),

    /// A cascade would produce a state violating the data model's
    /// invariants. This is a programming error in the engine, not a user
    /// mistake, and must be surfaced rather than swallowed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A mutation supplied a timestamp that would invert a temporal
    /// window (`created > expired`, or an earlier expiry than already
    /// recorded).
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The repository or an attached listener raised during a mutation.
    #[error("backend error: {0}")]
    Backend(#[from] RepositoryError),
}

pub type GraphResult<T> = Result<T, GraphError>;
