//! Error model shared by the catalog, partner and order crates.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A rule of the domain refused an input or a state transition.
///
/// Every variant is deterministic for the same input and state. Storage,
/// transport and arithmetic-engine failures are reported by their own types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Field-level check, e.g. a blank partner name or a price with three
    /// decimal places.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Malformed key: an unparsable UUID, an empty service code.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Names what is missing, e.g. `"partner"`.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate registration or a stale stream revision.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
