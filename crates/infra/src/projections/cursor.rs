use std::collections::HashMap;
use std::sync::RwLock;

use costbook_core::AggregateId;
use costbook_events::StreamPosition;

use super::ProjectionError;

/// Last applied sequence number per stream.
#[derive(Debug, Default)]
pub(crate) struct StreamCursors {
    inner: RwLock<HashMap<AggregateId, u64>>,
}

impl StreamCursors {
    /// `Ok(true)` when `position` is the next event of its stream,
    /// `Ok(false)` for a replay that was already applied.
    pub(crate) fn should_apply(&self, position: StreamPosition) -> Result<bool, ProjectionError> {
        let seq = position.sequence_number;
        let last = self.last(position.aggregate_id);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(false);
        }
        // The first event seen may start anywhere; after that, no gaps.
        if last != 0 && seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        Ok(true)
    }

    pub(crate) fn advance(&self, position: StreamPosition) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.insert(position.aggregate_id, position.sequence_number);
        }
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.clear();
        }
    }

    fn last(&self, aggregate_id: AggregateId) -> u64 {
        match self.inner.read() {
            Ok(cursors) => cursors.get(&aggregate_id).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_in_order_skips_replays_and_rejects_gaps() {
        let cursors = StreamCursors::default();
        let stream = AggregateId::new();
        let first = StreamPosition::new(stream, 1);

        assert_eq!(cursors.should_apply(first), Ok(true));
        cursors.advance(first);
        assert_eq!(cursors.should_apply(first), Ok(false));
        assert_eq!(cursors.should_apply(first.next()), Ok(true));
        assert_eq!(
            cursors.should_apply(StreamPosition::new(stream, 4)),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 4 })
        );
        assert!(cursors.should_apply(StreamPosition::new(AggregateId::new(), 0)).is_err());

        cursors.clear();
        assert_eq!(cursors.should_apply(first), Ok(true));
    }
}
