//! Projections: read models built from published envelopes.
//!
//! Every projection here is idempotent under at-least-once delivery (per
//! stream cursors) and can be rebuilt from the event store.

mod cursor;
pub mod orders;
pub mod partners;

use thiserror::Error;

pub use orders::{OrderHistoryProjection, OrderReadModel};
pub use partners::{PartnerDirectoryProjection, PartnerReadModel};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    /// The payload names a different aggregate than its envelope.
    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}
