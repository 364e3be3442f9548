//! Reference catalog: service types, material types, services, materials and
//! the consumption norms linking services to materials.
//!
//! Records are validated on construction. Cross-record guarantees (unique
//! keys, existing foreign keys, cascading norm removal) belong to the store
//! implementing [`CatalogWriter`]; readers only see committed, consistent
//! state through [`CatalogReader`].

pub mod consumption;
pub mod ids;
pub mod material;
pub mod memory;
pub mod service;
pub mod store;

mod validate;

pub use consumption::ConsumptionNorm;
pub use ids::{MaterialId, MaterialTypeName, ServiceCode, ServiceTypeName};
pub use material::{Material, MaterialType};
pub use memory::InMemoryCatalog;
pub use service::{Service, ServiceType};
pub use store::{CatalogEntity, CatalogError, CatalogReader, CatalogResult, CatalogWriter};
