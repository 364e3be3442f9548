//! Runs partner and order commands against their event streams.
//!
//! ```text
//! load stream -> rehydrate -> handle -> append (expected revision) -> publish
//! ```
//!
//! Events are published only after the append committed. A failed publish
//! is reported to the caller but the events stay stored; read models catch
//! up on the next rebuild.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use costbook_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use costbook_events::{Event, EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command clashes with current state, or the stream moved meanwhile.
    #[error("conflict: {0}")]
    Concurrency(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("{0} not found")]
    NotFound(String),
    /// A stored payload no longer reads back as the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => Self::Concurrency(msg),
            other => Self::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::InvariantViolation(msg) => Self::InvariantViolation(msg),
            DomainError::Conflict(msg) => Self::Concurrency(msg),
            DomainError::NotFound(what) => Self::NotFound(what),
        }
    }
}

/// Command execution over any store and bus.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run `command` against the stream `aggregate_id`.
    ///
    /// `make_aggregate` builds the blank aggregate the history is replayed
    /// onto. Returns the committed events; empty when the command decided
    /// nothing.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        let (aggregate, revision) = rehydrate(make_aggregate(aggregate_id), aggregate_id, &history)?;

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_type = aggregate_type.into();
        let pending = decided
            .iter()
            .map(|event| UncommittedEvent::from_typed(aggregate_id, aggregate_type.as_str(), Uuid::now_v7(), event))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(pending, ExpectedVersion::Exact(revision))?;
        debug!(
            aggregate_type = %aggregate_type,
            aggregate_id = %aggregate_id,
            revision = revision + committed.len() as u64,
            "events committed"
        );

        for event in &committed {
            self.bus
                .publish(event.to_envelope())
                .map_err(|e| DispatchError::Publish(e.to_string()))?;
        }
        Ok(committed)
    }
}

/// Replay `history` onto `aggregate`, returning it with the stream revision.
///
/// The stream must belong to `aggregate_id` and count up from 1 without gaps.
fn rehydrate<A>(mut aggregate: A, aggregate_id: AggregateId, history: &[StoredEvent]) -> Result<(A, u64), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    let mut revision = 0u64;
    for stored in history {
        if stored.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "stream {aggregate_id} contains an event of {}",
                stored.aggregate_id
            ))));
        }
        if stored.sequence_number != revision + 1 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "stream {aggregate_id} jumps from {revision} to {}",
                stored.sequence_number
            ))));
        }

        let event: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(format!("{}: {e}", stored.event_type)))?;
        aggregate.apply(&event);
        revision = stored.sequence_number;
    }
    Ok((aggregate, revision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{NaiveDate, Utc};
    use costbook_catalog::ServiceCode;
    use costbook_events::InMemoryEventBus;
    use costbook_orders::{Order, OrderCommand, OrderId, PlaceOrder};
    use costbook_partners::PartnerId;

    use crate::event_store::InMemoryEventStore;

    type Dispatcher =
        CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

    fn dispatcher() -> (Dispatcher, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), bus.clone()), bus)
    }

    fn place(order_id: OrderId, quantity: i64) -> OrderCommand {
        OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            partner_id: PartnerId::new(AggregateId::new()),
            service_code: ServiceCode::new("S1").unwrap(),
            quantity,
            execution_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            occurred_at: Utc::now(),
        })
    }

    fn run(d: &Dispatcher, id: AggregateId, cmd: OrderCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        d.dispatch(id, "orders.order", cmd, |id| Order::empty(OrderId::new(id)))
    }

    #[test]
    fn appends_then_publishes() {
        let (d, bus) = dispatcher();
        let sub = bus.subscribe();
        let id = AggregateId::new();

        let committed = run(&d, id, place(OrderId::new(id), 2)).unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(committed[0].event_type, "orders.order.placed");

        let env = sub.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(env.aggregate_id(), id);
        assert_eq!(env.aggregate_type(), "orders.order");
        assert_eq!(env.sequence_number(), 1);
        assert_eq!(env.event_type(), "orders.order.placed");
    }

    #[test]
    fn rehydrates_before_handling() {
        let (d, _bus) = dispatcher();
        let id = AggregateId::new();
        run(&d, id, place(OrderId::new(id), 2)).unwrap();

        let err = run(&d, id, place(OrderId::new(id), 2)).unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }

    #[test]
    fn domain_rejection_stores_nothing() {
        let (d, bus) = dispatcher();
        let sub = bus.subscribe();
        let id = AggregateId::new();

        let err = run(&d, id, place(OrderId::new(id), 0)).unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(d.store().load_stream(id).unwrap().is_empty());
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn unreadable_history_is_reported() {
        let (d, _bus) = dispatcher();
        let id = AggregateId::new();
        d.store()
            .append(
                vec![UncommittedEvent {
                    event_id: Uuid::now_v7(),
                    aggregate_id: id,
                    aggregate_type: "orders.order".to_string(),
                    event_type: "orders.order.placed".to_string(),
                    event_version: 1,
                    occurred_at: Utc::now(),
                    payload: serde_json::json!({ "unexpected": true }),
                }],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let err = run(&d, id, place(OrderId::new(id), 1)).unwrap_err();
        assert!(matches!(err, DispatchError::Deserialize(ref msg) if msg.contains("orders.order.placed")));
    }
}
