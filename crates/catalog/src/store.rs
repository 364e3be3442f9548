//! Catalog access traits.
//!
//! The costing engine depends only on [`CatalogReader`]; it is handed a
//! reader explicitly instead of reaching for a process-wide connection, so
//! tests run against [`crate::InMemoryCatalog`] or a hand-written stub.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use costbook_core::DomainError;

use crate::consumption::ConsumptionNorm;
use crate::ids::{MaterialId, MaterialTypeName, ServiceCode, ServiceTypeName};
use crate::material::{Material, MaterialType};
use crate::service::{Service, ServiceType};

/// Kind of catalog record, used in error reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogEntity {
    ServiceType,
    MaterialType,
    Service,
    Material,
    ConsumptionNorm,
}

impl core::fmt::Display for CatalogEntity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            CatalogEntity::ServiceType => "service type",
            CatalogEntity::MaterialType => "material type",
            CatalogEntity::Service => "service",
            CatalogEntity::Material => "material",
            CatalogEntity::ConsumptionNorm => "consumption norm",
        })
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Failures reported by catalog stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Primary key or unique display name already taken.
    #[error("{entity} '{key}' already exists")]
    Duplicate { entity: CatalogEntity, key: String },

    /// A write referenced a parent record that does not exist.
    #[error("referenced {entity} '{key}' does not exist")]
    MissingReference { entity: CatalogEntity, key: String },

    /// A removal was refused because other records still point at the target.
    #[error("{entity} '{key}' is still referenced by {dependents}")]
    InUse {
        entity: CatalogEntity,
        key: String,
        dependents: &'static str,
    },

    /// The record addressed by an update/removal does not exist.
    #[error("{entity} '{key}' not found")]
    NotFound { entity: CatalogEntity, key: String },

    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// The backing store failed (connection, lock poisoning, corrupt row).
    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// Read access to committed catalog state.
///
/// Lookups return `Ok(None)` for absent keys; `Err` is reserved for store
/// failures.
pub trait CatalogReader: Send + Sync {
    fn service_type(&self, name: &ServiceTypeName) -> CatalogResult<Option<ServiceType>>;

    fn material_type(&self, name: &MaterialTypeName) -> CatalogResult<Option<MaterialType>>;

    fn service(&self, code: &ServiceCode) -> CatalogResult<Option<Service>>;

    fn material(&self, id: MaterialId) -> CatalogResult<Option<Material>>;

    /// All consumption rows of one service, ordered by material id.
    fn consumption_norms(&self, code: &ServiceCode) -> CatalogResult<Vec<ConsumptionNorm>>;

    fn service_types(&self) -> CatalogResult<Vec<ServiceType>>;

    fn material_types(&self) -> CatalogResult<Vec<MaterialType>>;

    fn services(&self) -> CatalogResult<Vec<Service>>;

    fn materials(&self) -> CatalogResult<Vec<Material>>;
}

/// Write access, enforcing key uniqueness and referential integrity.
pub trait CatalogWriter: Send + Sync {
    fn insert_service_type(&self, service_type: ServiceType) -> CatalogResult<()>;

    fn insert_material_type(&self, material_type: MaterialType) -> CatalogResult<()>;

    /// Fails with `MissingReference` if the service type is unknown.
    fn insert_service(&self, service: Service) -> CatalogResult<()>;

    /// Fails with `MissingReference` if the material type is unknown.
    fn insert_material(&self, material: Material) -> CatalogResult<()>;

    /// Fails with `MissingReference` unless both parents exist.
    fn insert_consumption_norm(&self, norm: ConsumptionNorm) -> CatalogResult<()>;

    fn update_material_price(&self, id: MaterialId, current_price: Decimal) -> CatalogResult<Material>;

    /// Removes the service and every consumption row that names it.
    fn remove_service(&self, code: &ServiceCode) -> CatalogResult<Service>;

    /// Removes the material and every consumption row that names it.
    fn remove_material(&self, id: MaterialId) -> CatalogResult<Material>;

    /// Refused with `InUse` while any service belongs to the type.
    fn remove_service_type(&self, name: &ServiceTypeName) -> CatalogResult<ServiceType>;

    /// Refused with `InUse` while any material belongs to the type.
    fn remove_material_type(&self, name: &MaterialTypeName) -> CatalogResult<MaterialType>;
}

impl<S> CatalogReader for Arc<S>
where
    S: CatalogReader + ?Sized,
{
    fn service_type(&self, name: &ServiceTypeName) -> CatalogResult<Option<ServiceType>> {
        (**self).service_type(name)
    }

    fn material_type(&self, name: &MaterialTypeName) -> CatalogResult<Option<MaterialType>> {
        (**self).material_type(name)
    }

    fn service(&self, code: &ServiceCode) -> CatalogResult<Option<Service>> {
        (**self).service(code)
    }

    fn material(&self, id: MaterialId) -> CatalogResult<Option<Material>> {
        (**self).material(id)
    }

    fn consumption_norms(&self, code: &ServiceCode) -> CatalogResult<Vec<ConsumptionNorm>> {
        (**self).consumption_norms(code)
    }

    fn service_types(&self) -> CatalogResult<Vec<ServiceType>> {
        (**self).service_types()
    }

    fn material_types(&self) -> CatalogResult<Vec<MaterialType>> {
        (**self).material_types()
    }

    fn services(&self) -> CatalogResult<Vec<Service>> {
        (**self).services()
    }

    fn materials(&self) -> CatalogResult<Vec<Material>> {
        (**self).materials()
    }
}

impl<S> CatalogWriter for Arc<S>
where
    S: CatalogWriter + ?Sized,
{
    fn insert_service_type(&self, service_type: ServiceType) -> CatalogResult<()> {
        (**self).insert_service_type(service_type)
    }

    fn insert_material_type(&self, material_type: MaterialType) -> CatalogResult<()> {
        (**self).insert_material_type(material_type)
    }

    fn insert_service(&self, service: Service) -> CatalogResult<()> {
        (**self).insert_service(service)
    }

    fn insert_material(&self, material: Material) -> CatalogResult<()> {
        (**self).insert_material(material)
    }

    fn insert_consumption_norm(&self, norm: ConsumptionNorm) -> CatalogResult<()> {
        (**self).insert_consumption_norm(norm)
    }

    fn update_material_price(&self, id: MaterialId, current_price: Decimal) -> CatalogResult<Material> {
        (**self).update_material_price(id, current_price)
    }

    fn remove_service(&self, code: &ServiceCode) -> CatalogResult<Service> {
        (**self).remove_service(code)
    }

    fn remove_material(&self, id: MaterialId) -> CatalogResult<Material> {
        (**self).remove_material(id)
    }

    fn remove_service_type(&self, name: &ServiceTypeName) -> CatalogResult<ServiceType> {
        (**self).remove_service_type(name)
    }

    fn remove_material_type(&self, name: &MaterialTypeName) -> CatalogResult<MaterialType> {
        (**self).remove_material_type(name)
    }
}
