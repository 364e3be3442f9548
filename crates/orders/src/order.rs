use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use costbook_catalog::ServiceCode;
use costbook_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use costbook_events::Event;
use costbook_partners::PartnerId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What was done, for whom, how much of it and when.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placed {
    partner_id: PartnerId,
    service_code: ServiceCode,
    quantity: i64,
    execution_date: NaiveDate,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    placed: Option<Placed>,
    version: u64,
}

impl Order {
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            placed: None,
            version: 0,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.placed.is_some()
    }

    pub fn partner_id(&self) -> Option<PartnerId> {
        self.placed.as_ref().map(|p| p.partner_id)
    }

    pub fn service_code(&self) -> Option<&ServiceCode> {
        self.placed.as_ref().map(|p| &p.service_code)
    }

    pub fn quantity(&self) -> Option<i64> {
        self.placed.as_ref().map(|p| p.quantity)
    }

    pub fn execution_date(&self) -> Option<NaiveDate> {
        self.placed.as_ref().map(|p| p.execution_date)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub partner_id: PartnerId,
    pub service_code: ServiceCode,
    pub quantity: i64,
    pub execution_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub partner_id: PartnerId,
    pub service_code: ServiceCode,
    pub quantity: i64,
    pub execution_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.placed = Some(Placed {
                    partner_id: e.partner_id,
                    service_code: e.service_code.clone(),
                    quantity: e.quantity,
                    execution_date: e.execution_date,
                });
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
        }
    }
}

impl Order {
    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.is_placed() {
            return Err(DomainError::conflict("order already placed"));
        }
        if self.id != cmd.order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            partner_id: cmd.partner_id,
            service_code: cmd.service_code.clone(),
            quantity: cmd.quantity,
            execution_date: cmd.execution_date,
            occurred_at: cmd.occurred_at,
        })])
    }
}
