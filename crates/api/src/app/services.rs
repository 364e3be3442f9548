//! Infrastructure wiring: event store and bus, dispatcher, catalog backend,
//! projections and the workers feeding them.

use std::io;
use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use costbook_catalog::{CatalogError, CatalogReader};
use costbook_core::{Aggregate, AggregateId, DomainError};
use costbook_events::{EventEnvelope, InMemoryEventBus};
use costbook_infra::{
    catalog::PostgresCatalogStore,
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{EventStore, InMemoryEventStore, StoredEvent},
    projections::{
        OrderHistoryProjection, OrderReadModel, PartnerDirectoryProjection, PartnerReadModel, ProjectionError,
        orders::ORDER_AGGREGATE_TYPE, partners::PARTNER_AGGREGATE_TYPE,
    },
    read_model::InMemoryReadStore,
    workers::{ProjectionWorker, WorkerHandle},
};
use costbook_orders::OrderId;
use costbook_partners::PartnerId;

use crate::app::seed;
use crate::config::ApiConfig;

type Bus = InMemoryEventBus<EventEnvelope<JsonValue>>;
type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<Bus>>;

pub type PartnerDirectory = PartnerDirectoryProjection<Arc<InMemoryReadStore<PartnerId, PartnerReadModel>>>;
pub type OrderHistory = OrderHistoryProjection<Arc<InMemoryReadStore<OrderId, OrderReadModel>>>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("catalog database unavailable: {0}")]
    Database(String),
    #[error("catalog migration failed: {0}")]
    Migrate(String),
    #[error("demo catalog could not be seeded: {0}")]
    Seed(#[from] CatalogError),
    #[error("projection rebuild failed: {0}")]
    Rebuild(ProjectionError),
    #[error("event store unavailable: {0}")]
    Store(String),
    #[error("failed to spawn projection worker: {0}")]
    Worker(#[from] io::Error),
}

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    dispatcher: Dispatcher,
    catalog: Arc<dyn CatalogReader>,
    partners: Arc<PartnerDirectory>,
    orders: Arc<OrderHistory>,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl AppServices {
    /// In-memory event store and bus over the given catalog.
    ///
    /// Projections are rebuilt from the store, then kept current by one
    /// worker each.
    pub fn new(catalog: Arc<dyn CatalogReader>) -> Result<Self, StartupError> {
        let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
        let dispatcher = CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), bus.clone());

        let partners = Arc::new(PartnerDirectoryProjection::new(Arc::new(InMemoryReadStore::new())));
        let orders = Arc::new(OrderHistoryProjection::new(Arc::new(InMemoryReadStore::new())));

        let services = Self {
            dispatcher,
            catalog,
            partners: partners.clone(),
            orders: orders.clone(),
            workers: Mutex::new(Vec::new()),
        };
        services.rebuild_projections()?;

        let partner_worker =
            ProjectionWorker::spawn("partner-directory", bus.clone(), move |env: EventEnvelope<JsonValue>| {
                partners.apply_envelope(&env)
            })?;
        let order_worker = ProjectionWorker::spawn("order-history", bus, move |env: EventEnvelope<JsonValue>| {
            orders.apply_envelope(&env)
        })?;

        if let Ok(mut workers) = services.workers.lock() {
            workers.push(partner_worker);
            workers.push(order_worker);
        }

        Ok(services)
    }

    pub fn catalog(&self) -> &dyn CatalogReader {
        self.catalog.as_ref()
    }

    pub fn partners(&self) -> &PartnerDirectory {
        &self.partners
    }

    pub fn orders(&self) -> &OrderHistory {
        &self.orders
    }

    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &'static str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: costbook_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        self.dispatcher
            .dispatch(aggregate_id, aggregate_type, command, make_aggregate)
    }

    /// Replay every stored partner and order stream into the read models.
    pub fn rebuild_projections(&self) -> Result<(), StartupError> {
        let store = self.dispatcher.store();
        let envelopes = |aggregate_type: &str| {
            store
                .load_all(aggregate_type)
                .map(|events| events.iter().map(StoredEvent::to_envelope).collect::<Vec<_>>())
                .map_err(|e| StartupError::Store(e.to_string()))
        };

        self.partners
            .rebuild_from_scratch(envelopes(PARTNER_AGGREGATE_TYPE)?)
            .map_err(StartupError::Rebuild)?;
        self.orders
            .rebuild_from_scratch(envelopes(ORDER_AGGREGATE_TYPE)?)
            .map_err(StartupError::Rebuild)?;
        Ok(())
    }

    /// Stop the projection workers. Later calls are no-ops.
    pub fn shutdown(&self) {
        let handles: Vec<WorkerHandle> = match self.workers.lock() {
            Ok(mut workers) => workers.drain(..).collect(),
            Err(_) => return,
        };
        for handle in handles {
            handle.shutdown();
        }
    }
}

impl Drop for AppServices {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pick the catalog backend from `config` and wire everything around it.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    let catalog: Arc<dyn CatalogReader> = match &config.database_url {
        Some(url) => {
            let store = PostgresCatalogStore::connect(url)
                .await
                .map_err(|e| StartupError::Database(e.to_string()))?;
            store
                .migrate()
                .await
                .map_err(|e| StartupError::Migrate(e.to_string()))?;
            info!("serving catalog from postgres");
            Arc::new(store)
        }
        None => {
            info!("serving seeded in-memory catalog");
            Arc::new(seed::demo_catalog()?)
        }
    };

    AppServices::new(catalog)
}
