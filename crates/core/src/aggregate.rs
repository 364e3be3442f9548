//! Decide/evolve contract for event-sourced records (partners, orders).

use crate::error::{DomainError, DomainResult};

pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Events applied so far; equals the sequence number of the last one.
    fn version(&self) -> u64;
}

/// Stream revision an append is conditioned on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Append unconditionally.
    Any,
    /// The stream must hold exactly this many events (0 = not created yet).
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, current: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(expected) => expected == current,
        }
    }

    /// `Conflict` when `current` is not what the writer saw.
    pub fn check(self, current: u64) -> DomainResult<()> {
        if self.matches(current) {
            return Ok(());
        }
        Err(DomainError::conflict(format!(
            "stream revision mismatch (expected {self:?}, stream at {current})"
        )))
    }
}

/// `handle` decides which events a command causes without touching state;
/// `apply` folds one committed event in and bumps `version()` by one.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
