use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use costbook_core::AggregateId;

/// Where a committed event sits: its stream and its 1-based index in it.
///
/// Orders by stream first, so sorting positions replays every stream in
/// commit order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamPosition {
    pub aggregate_id: AggregateId,
    pub sequence_number: u64,
}

impl StreamPosition {
    pub fn new(aggregate_id: AggregateId, sequence_number: u64) -> Self {
        Self {
            aggregate_id,
            sequence_number,
        }
    }

    /// Position of the next event in the same stream.
    pub fn next(self) -> Self {
        Self::new(self.aggregate_id, self.sequence_number + 1)
    }
}

/// A committed event as delivered to subscribers.
///
/// Subscribers filter on [`EventEnvelope::aggregate_type`] and use
/// [`EventEnvelope::position`] to drop duplicate deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    aggregate_type: String,
    position: StreamPosition,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_type: impl Into<String>,
        position: StreamPosition,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_type: aggregate_type.into(),
            position,
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn is_from(&self, aggregate_type: &str) -> bool {
        self.aggregate_type == aggregate_type
    }

    pub fn position(&self) -> StreamPosition {
        self.position
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.position.aggregate_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.position.sequence_number
    }

    /// e.g. `partners.partner.registered`
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
