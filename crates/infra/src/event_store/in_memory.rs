use std::collections::HashMap;
use std::sync::RwLock;

use costbook_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Streams kept in a `HashMap` behind one lock; backs the demo server and
/// tests.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> EventStoreError {
        EventStoreError::Backend("event store lock poisoned".to_string())
    }
}

/// The single stream a batch targets.
fn batch_target(events: &[UncommittedEvent]) -> Result<Option<(AggregateId, &str)>, EventStoreError> {
    let Some(first) = events.first() else {
        return Ok(None);
    };
    if let Some(idx) = events.iter().position(|e| e.aggregate_id != first.aggregate_id) {
        return Err(EventStoreError::InvalidAppend(format!(
            "batch spans several streams (first stray event at index {idx})"
        )));
    }
    if let Some(idx) = events.iter().position(|e| e.aggregate_type != first.aggregate_type) {
        return Err(EventStoreError::AggregateTypeMismatch(format!(
            "batch mixes aggregate types (first stray event at index {idx})"
        )));
    }
    Ok(Some((first.aggregate_id, first.aggregate_type.as_str())))
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some((aggregate_id, aggregate_type)) = batch_target(&events)? else {
            return Ok(vec![]);
        };
        let aggregate_type = aggregate_type.to_string();

        let mut streams = self.streams.write().map_err(|_| Self::poisoned())?;
        let stream = streams.entry(aggregate_id).or_default();

        if let Some(head) = stream.first().filter(|head| head.aggregate_type != aggregate_type) {
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "stream {aggregate_id} holds '{}', not '{aggregate_type}'",
                head.aggregate_type
            )));
        }

        let current = stream.len() as u64;
        expected_version
            .check(current)
            .map_err(|e| EventStoreError::Concurrency(e.to_string()))?;

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(event, seq)| event.commit(seq))
            .collect();
        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn load_all(&self, aggregate_type: &str) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<StoredEvent> = streams
            .values()
            .filter(|stream| stream.first().is_some_and(|head| head.aggregate_type == aggregate_type))
            .flatten()
            .cloned()
            .collect();
        all.sort_by_key(StoredEvent::position);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    const PARTNER: &str = "partners.partner";
    const ORDER: &str = "orders.order";

    fn event(aggregate_id: AggregateId, aggregate_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: format!("{aggregate_type}.changed"),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "rating": 4 }),
        }
    }

    fn sequence_numbers(events: &[StoredEvent]) -> Vec<u64> {
        events.iter().map(|e| e.sequence_number).collect()
    }

    #[test]
    fn appends_continue_the_stream() {
        let store = InMemoryEventStore::new();
        let partner = AggregateId::new();

        let first = store
            .append(vec![event(partner, PARTNER), event(partner, PARTNER)], ExpectedVersion::Exact(0))
            .unwrap();
        let second = store.append(vec![event(partner, PARTNER)], ExpectedVersion::Exact(2)).unwrap();

        assert_eq!(sequence_numbers(&first), vec![1, 2]);
        assert_eq!(sequence_numbers(&second), vec![3]);
        assert_eq!(sequence_numbers(&store.load_stream(partner).unwrap()), vec![1, 2, 3]);
        assert!(store.load_stream(AggregateId::new()).unwrap().is_empty());
    }

    #[test]
    fn writer_with_a_stale_view_loses() {
        let store = InMemoryEventStore::new();
        let partner = AggregateId::new();
        store.append(vec![event(partner, PARTNER)], ExpectedVersion::Exact(0)).unwrap();

        let err = store
            .append(vec![event(partner, PARTNER)], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(partner).unwrap().len(), 1);
    }

    #[test]
    fn batches_must_target_one_stream() {
        let store = InMemoryEventStore::new();
        let order = AggregateId::new();

        let err = store
            .append(vec![event(order, ORDER), event(AggregateId::new(), ORDER)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));

        let err = store
            .append(vec![event(order, ORDER), event(order, PARTNER)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
        assert!(store.load_stream(order).unwrap().is_empty());
    }

    #[test]
    fn a_stream_keeps_its_aggregate_type() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(vec![event(id, ORDER)], ExpectedVersion::Any).unwrap();

        let err = store.append(vec![event(id, PARTNER)], ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn load_all_returns_one_type_in_stream_order() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();
        store.append(vec![event(b, PARTNER)], ExpectedVersion::Any).unwrap();
        store
            .append(vec![event(a, PARTNER), event(a, PARTNER)], ExpectedVersion::Any)
            .unwrap();
        store.append(vec![event(AggregateId::new(), ORDER)], ExpectedVersion::Any).unwrap();

        let partners = store.load_all(PARTNER).unwrap();
        assert_eq!(partners.len(), 3);
        assert!(partners.windows(2).all(|w| w[0].position() < w[1].position()));
        assert!(partners.iter().all(|e| e.aggregate_type == PARTNER));
        assert!(store.load_all("catalog.service").unwrap().is_empty());
    }
}
