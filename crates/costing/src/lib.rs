//! Costing engine.
//!
//! Two pure calculations over an injected [`CatalogReader`]:
//!
//! - [`compute_service_cost`]: labor plus bill-of-materials cost of one unit
//!   of a service, rounded half-up to two decimal places
//! - [`compute_material_quantity`]: whole units of a material type needed for
//!   an order, always rounded up
//!
//! Every failure is a [`CostingError`]; no partial results are returned.
//!
//! [`CatalogReader`]: costbook_catalog::CatalogReader

pub mod error;
pub mod material_quantity;
pub mod service_cost;

pub use error::{CostingError, CostingResult};
pub use material_quantity::{compute_material_quantity, whole_quantity};
pub use service_cost::{
    COST_ROUNDING, COST_SCALE, MaterialCostLine, ServiceCostBreakdown, compute_service_cost,
    service_cost_breakdown,
};
