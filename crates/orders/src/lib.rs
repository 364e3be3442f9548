//! Order ledger: records of services performed for partners.
//!
//! An order is written once and never changes. Whether the referenced
//! partner and service exist is checked by the caller before dispatch.

pub mod order;

pub use order::{Order, OrderCommand, OrderEvent, OrderId, OrderPlaced, PlaceOrder};
