use serde_json::Value as JsonValue;

use costbook_events::EventEnvelope;
use costbook_partners::{PartnerDetails, PartnerEvent, PartnerId, PartnerType};

use super::ProjectionError;
use super::cursor::StreamCursors;
use crate::read_model::ReadStore;

pub const PARTNER_AGGREGATE_TYPE: &str = "partners.partner";

/// Partner directory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerReadModel {
    pub partner_id: PartnerId,
    pub partner_type: PartnerType,
    pub name: String,
    pub manager: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub inn: String,
    pub rating: i32,
}

impl PartnerReadModel {
    fn from_details(partner_id: PartnerId, d: PartnerDetails) -> Self {
        Self {
            partner_id,
            partner_type: d.partner_type,
            name: d.name,
            manager: d.manager,
            email: d.email,
            phone: d.phone,
            address: d.address,
            inn: d.inn,
            rating: d.rating,
        }
    }
}

/// Partner directory: listing, lookup, search and the uniqueness checks the
/// API runs before registering or editing a partner.
#[derive(Debug)]
pub struct PartnerDirectoryProjection<S>
where
    S: ReadStore<PartnerId, PartnerReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> PartnerDirectoryProjection<S>
where
    S: ReadStore<PartnerId, PartnerReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::default(),
        }
    }

    pub fn get(&self, partner_id: &PartnerId) -> Option<PartnerReadModel> {
        self.store.get(partner_id)
    }

    /// All partners ordered by name.
    pub fn list(&self) -> Vec<PartnerReadModel> {
        let mut all = self.store.list();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.partner_id.cmp(&b.partner_id)));
        all
    }

    /// Case-insensitive name substring search.
    pub fn search_by_name(&self, query: &str) -> Vec<PartnerReadModel> {
        let q = query.to_lowercase();
        self.list()
            .into_iter()
            .filter(|rm| rm.name.to_lowercase().contains(&q))
            .collect()
    }

    /// Whether another partner already uses `name`.
    pub fn name_taken(&self, name: &str, except: Option<PartnerId>) -> bool {
        let name = name.trim();
        self.store
            .list()
            .iter()
            .any(|rm| Some(rm.partner_id) != except && rm.name == name)
    }

    /// Whether another partner already uses `inn`.
    pub fn inn_taken(&self, inn: &str, except: Option<PartnerId>) -> bool {
        let inn = inn.trim();
        self.store
            .list()
            .iter()
            .any(|rm| Some(rm.partner_id) != except && rm.inn == inn)
    }

    /// Apply a published envelope. Envelopes of other aggregates are ignored,
    /// replays at or below the stream cursor are skipped.
    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if !envelope.is_from(PARTNER_AGGREGATE_TYPE) {
            return Ok(());
        }

        let position = envelope.position();
        if !self.cursors.should_apply(position)? {
            return Ok(());
        }

        let event: PartnerEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let (partner_id, details) = match event {
            PartnerEvent::PartnerRegistered(e) => (e.partner_id, e.details),
            PartnerEvent::PartnerUpdated(e) => (e.partner_id, e.details),
        };
        if partner_id.0 != position.aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event partner_id does not match envelope aggregate_id".to_string(),
            ));
        }

        self.store
            .upsert(partner_id, PartnerReadModel::from_details(partner_id, details));
        self.cursors.advance(position);
        Ok(())
    }

    /// Clear the directory and replay `envelopes` in stream order.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use costbook_core::AggregateId;
    use costbook_events::{Event, StreamPosition};
    use costbook_partners::{PartnerRegistered, PartnerUpdated};
    use uuid::Uuid;

    use crate::read_model::InMemoryReadStore;

    type Projection = PartnerDirectoryProjection<Arc<InMemoryReadStore<PartnerId, PartnerReadModel>>>;

    fn projection() -> Projection {
        PartnerDirectoryProjection::new(Arc::new(InMemoryReadStore::new()))
    }

    fn details(name: &str, inn: &str) -> PartnerDetails {
        PartnerDetails {
            partner_type: PartnerType::IndividualEntrepreneur,
            name: name.to_string(),
            manager: "Petrov P.P.".to_string(),
            email: "petrov@example.ru".to_string(),
            phone: "+79990000000".to_string(),
            address: "Kazan".to_string(),
            inn: inn.to_string(),
            rating: 3,
        }
    }

    fn envelope(partner_id: PartnerId, seq: u64, event: PartnerEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            PARTNER_AGGREGATE_TYPE,
            StreamPosition::new(partner_id.0, seq),
            event.event_type(),
            Utc::now(),
            serde_json::to_value(&event).unwrap(),
        )
    }

    fn registered(partner_id: PartnerId, name: &str, inn: &str) -> EventEnvelope<JsonValue> {
        envelope(
            partner_id,
            1,
            PartnerEvent::PartnerRegistered(PartnerRegistered {
                partner_id,
                details: details(name, inn),
                occurred_at: Utc::now(),
            }),
        )
    }

    #[test]
    fn registration_and_update_are_projected() {
        let p = projection();
        let id = PartnerId::new(AggregateId::new());
        p.apply_envelope(&registered(id, "Alpha", "1234567890")).unwrap();

        let updated = envelope(
            id,
            2,
            PartnerEvent::PartnerUpdated(PartnerUpdated {
                partner_id: id,
                details: details("Alpha Plus", "1234567890"),
                occurred_at: Utc::now(),
            }),
        );
        p.apply_envelope(&updated).unwrap();

        let rm = p.get(&id).unwrap();
        assert_eq!(rm.name, "Alpha Plus");
        assert_eq!(p.list().len(), 1);
    }

    #[test]
    fn replays_are_ignored_and_gaps_rejected() {
        let p = projection();
        let id = PartnerId::new(AggregateId::new());
        let first = registered(id, "Alpha", "1234567890");
        p.apply_envelope(&first).unwrap();
        p.apply_envelope(&first).unwrap();
        assert_eq!(p.list().len(), 1);

        let gap = envelope(
            id,
            5,
            PartnerEvent::PartnerUpdated(PartnerUpdated {
                partner_id: id,
                details: details("Beta", "1234567890"),
                occurred_at: Utc::now(),
            }),
        );
        assert_eq!(
            p.apply_envelope(&gap),
            Err(ProjectionError::NonMonotonicSequence { last: 1, found: 5 })
        );
        assert_eq!(p.get(&id).unwrap().name, "Alpha");
    }

    #[test]
    fn other_aggregates_are_ignored() {
        let p = projection();
        let env = EventEnvelope::new(
            Uuid::now_v7(),
            "orders.order",
            StreamPosition::new(AggregateId::new(), 1),
            "orders.order.placed",
            Utc::now(),
            JsonValue::Null,
        );
        p.apply_envelope(&env).unwrap();
        assert!(p.list().is_empty());
    }

    #[test]
    fn uniqueness_lookups_skip_the_partner_being_edited() {
        let p = projection();
        let a = PartnerId::new(AggregateId::new());
        let b = PartnerId::new(AggregateId::new());
        p.apply_envelope(&registered(a, "Alpha", "1234567890")).unwrap();
        p.apply_envelope(&registered(b, "Beta", "123456789012")).unwrap();

        assert!(p.name_taken("Alpha", None));
        assert!(p.name_taken(" Alpha ", Some(b)));
        assert!(!p.name_taken("Alpha", Some(a)));
        assert!(p.inn_taken("123456789012", Some(a)));
        assert!(!p.inn_taken("123456789012", Some(b)));
        assert!(!p.name_taken("Gamma", None));
    }

    #[test]
    fn list_is_sorted_and_search_is_case_insensitive() {
        let p = projection();
        p.apply_envelope(&registered(PartnerId::new(AggregateId::new()), "Zeta", "1111111111"))
            .unwrap();
        p.apply_envelope(&registered(PartnerId::new(AggregateId::new()), "Alpha", "2222222222"))
            .unwrap();

        let names: Vec<_> = p.list().into_iter().map(|rm| rm.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(p.search_by_name("zE").len(), 1);
    }

    #[test]
    fn rebuild_matches_incremental_apply() {
        let p = projection();
        let a = PartnerId::new(AggregateId::new());
        let env = registered(a, "Alpha", "1234567890");
        p.apply_envelope(&env).unwrap();
        let before = p.list();

        p.rebuild_from_scratch(vec![env]).unwrap();
        assert_eq!(p.list(), before);

        p.rebuild_from_scratch(Vec::new()).unwrap();
        assert!(p.list().is_empty());
    }
}
