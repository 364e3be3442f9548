//! Event primitives shared by the partner and order modules.
//!
//! - [`Event`]: the contract every domain event enum implements
//! - [`EventEnvelope`]: stream metadata wrapped around a payload
//! - [`EventBus`]: publish/subscribe transport used after an append succeeds

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{EventEnvelope, StreamPosition};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
