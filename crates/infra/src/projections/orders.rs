use chrono::NaiveDate;
use serde_json::Value as JsonValue;

use costbook_catalog::ServiceCode;
use costbook_events::EventEnvelope;
use costbook_orders::{OrderEvent, OrderId};
use costbook_partners::PartnerId;

use super::ProjectionError;
use super::cursor::StreamCursors;
use crate::read_model::ReadStore;

pub const ORDER_AGGREGATE_TYPE: &str = "orders.order";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReadModel {
    pub order_id: OrderId,
    pub partner_id: PartnerId,
    pub service_code: ServiceCode,
    pub quantity: i64,
    pub execution_date: NaiveDate,
}

/// Per-partner service history.
#[derive(Debug)]
pub struct OrderHistoryProjection<S>
where
    S: ReadStore<OrderId, OrderReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> OrderHistoryProjection<S>
where
    S: ReadStore<OrderId, OrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::default(),
        }
    }

    pub fn get(&self, order_id: &OrderId) -> Option<OrderReadModel> {
        self.store.get(order_id)
    }

    /// Orders placed for `partner_id`, newest execution date first.
    pub fn history_for(&self, partner_id: PartnerId) -> Vec<OrderReadModel> {
        let mut orders: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|o| o.partner_id == partner_id)
            .collect();
        orders.sort_by(|a, b| {
            b.execution_date
                .cmp(&a.execution_date)
                .then(b.order_id.cmp(&a.order_id))
        });
        orders
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if !envelope.is_from(ORDER_AGGREGATE_TYPE) {
            return Ok(());
        }

        let position = envelope.position();
        if !self.cursors.should_apply(position)? {
            return Ok(());
        }

        let event: OrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        match event {
            OrderEvent::OrderPlaced(e) => {
                if e.order_id.0 != position.aggregate_id {
                    return Err(ProjectionError::StreamMismatch(
                        "event order_id does not match envelope aggregate_id".to_string(),
                    ));
                }
                self.store.upsert(
                    e.order_id,
                    OrderReadModel {
                        order_id: e.order_id,
                        partner_id: e.partner_id,
                        service_code: e.service_code,
                        quantity: e.quantity,
                        execution_date: e.execution_date,
                    },
                );
            }
        }

        self.cursors.advance(position);
        Ok(())
    }

    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();
        self.store.clear();
        self.cursors.clear();

        envs.sort_by_key(EventEnvelope::position);
        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}
