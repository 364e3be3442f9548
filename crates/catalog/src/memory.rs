//! In-memory catalog store for tests and local runs.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use costbook_core::Entity;
use rust_decimal::Decimal;

use crate::consumption::ConsumptionNorm;
use crate::ids::{MaterialId, MaterialTypeName, ServiceCode, ServiceTypeName};
use crate::material::{Material, MaterialType};
use crate::service::{Service, ServiceType};
use crate::store::{CatalogEntity, CatalogError, CatalogReader, CatalogResult, CatalogWriter};

#[derive(Debug, Default)]
struct Tables {
    service_types: BTreeMap<ServiceTypeName, ServiceType>,
    material_types: BTreeMap<MaterialTypeName, MaterialType>,
    services: BTreeMap<ServiceCode, Service>,
    materials: BTreeMap<MaterialId, Material>,
    norms: BTreeMap<(ServiceCode, MaterialId), ConsumptionNorm>,
}

/// Catalog held in `BTreeMap`s behind one `RwLock`.
///
/// Every write checks uniqueness and foreign keys under the write lock, so
/// readers never observe a dangling consumption row.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: RwLock<Tables>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| CatalogError::Backend("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| CatalogError::Backend("catalog lock poisoned".to_string()))
    }
}

/// Files `record` under its own identity.
fn put<E>(table: &mut BTreeMap<E::Id, E>, record: E)
where
    E: Entity,
    E::Id: Ord,
{
    table.insert(record.id().clone(), record);
}

fn duplicate(entity: CatalogEntity, key: impl ToString) -> CatalogError {
    CatalogError::Duplicate {
        entity,
        key: key.to_string(),
    }
}

fn missing(entity: CatalogEntity, key: impl ToString) -> CatalogError {
    CatalogError::MissingReference {
        entity,
        key: key.to_string(),
    }
}

fn not_found(entity: CatalogEntity, key: impl ToString) -> CatalogError {
    CatalogError::NotFound {
        entity,
        key: key.to_string(),
    }
}

impl CatalogReader for InMemoryCatalog {
    fn service_type(&self, name: &ServiceTypeName) -> CatalogResult<Option<ServiceType>> {
        Ok(self.read()?.service_types.get(name).cloned())
    }

    fn material_type(&self, name: &MaterialTypeName) -> CatalogResult<Option<MaterialType>> {
        Ok(self.read()?.material_types.get(name).cloned())
    }

    fn service(&self, code: &ServiceCode) -> CatalogResult<Option<Service>> {
        Ok(self.read()?.services.get(code).cloned())
    }

    fn material(&self, id: MaterialId) -> CatalogResult<Option<Material>> {
        Ok(self.read()?.materials.get(&id).cloned())
    }

    fn consumption_norms(&self, code: &ServiceCode) -> CatalogResult<Vec<ConsumptionNorm>> {
        Ok(self
            .read()?
            .norms
            .values()
            .filter(|n| n.service_code() == code)
            .cloned()
            .collect())
    }

    fn service_types(&self) -> CatalogResult<Vec<ServiceType>> {
        Ok(self.read()?.service_types.values().cloned().collect())
    }

    fn material_types(&self) -> CatalogResult<Vec<MaterialType>> {
        Ok(self.read()?.material_types.values().cloned().collect())
    }

    fn services(&self) -> CatalogResult<Vec<Service>> {
        Ok(self.read()?.services.values().cloned().collect())
    }

    fn materials(&self) -> CatalogResult<Vec<Material>> {
        Ok(self.read()?.materials.values().cloned().collect())
    }
}

impl CatalogWriter for InMemoryCatalog {
    fn insert_service_type(&self, service_type: ServiceType) -> CatalogResult<()> {
        let mut t = self.write()?;
        if t.service_types.contains_key(service_type.id()) {
            return Err(duplicate(CatalogEntity::ServiceType, service_type.id()));
        }
        put(&mut t.service_types, service_type);
        Ok(())
    }

    fn insert_material_type(&self, material_type: MaterialType) -> CatalogResult<()> {
        let mut t = self.write()?;
        if t.material_types.contains_key(material_type.id()) {
            return Err(duplicate(CatalogEntity::MaterialType, material_type.id()));
        }
        put(&mut t.material_types, material_type);
        Ok(())
    }

    fn insert_service(&self, service: Service) -> CatalogResult<()> {
        let mut t = self.write()?;
        if t.services.contains_key(service.id()) {
            return Err(duplicate(CatalogEntity::Service, service.id()));
        }
        if t.services.values().any(|s| s.name() == service.name()) {
            return Err(duplicate(CatalogEntity::Service, service.name()));
        }
        if !t.service_types.contains_key(service.service_type()) {
            return Err(missing(CatalogEntity::ServiceType, service.service_type()));
        }
        put(&mut t.services, service);
        Ok(())
    }

    fn insert_material(&self, material: Material) -> CatalogResult<()> {
        let mut t = self.write()?;
        if t.materials.contains_key(material.id()) {
            return Err(duplicate(CatalogEntity::Material, material.id()));
        }
        if t.materials.values().any(|m| m.name() == material.name()) {
            return Err(duplicate(CatalogEntity::Material, material.name()));
        }
        if !t.material_types.contains_key(material.material_type()) {
            return Err(missing(CatalogEntity::MaterialType, material.material_type()));
        }
        put(&mut t.materials, material);
        Ok(())
    }

    fn insert_consumption_norm(&self, norm: ConsumptionNorm) -> CatalogResult<()> {
        let mut t = self.write()?;
        let (service_code, material_id) = norm.id();
        if t.norms.contains_key(norm.id()) {
            return Err(duplicate(
                CatalogEntity::ConsumptionNorm,
                format!("{service_code}/{material_id}"),
            ));
        }
        if !t.services.contains_key(service_code) {
            return Err(missing(CatalogEntity::Service, service_code));
        }
        if !t.materials.contains_key(material_id) {
            return Err(missing(CatalogEntity::Material, material_id));
        }
        put(&mut t.norms, norm);
        Ok(())
    }

    fn update_material_price(&self, id: MaterialId, current_price: Decimal) -> CatalogResult<Material> {
        let mut t = self.write()?;
        let current = t
            .materials
            .get(&id)
            .ok_or_else(|| not_found(CatalogEntity::Material, id))?;
        let updated = current.with_current_price(current_price)?;
        put(&mut t.materials, updated.clone());
        Ok(updated)
    }

    fn remove_service(&self, code: &ServiceCode) -> CatalogResult<Service> {
        let mut t = self.write()?;
        let removed = t
            .services
            .remove(code)
            .ok_or_else(|| not_found(CatalogEntity::Service, code))?;
        t.norms.retain(|(s, _), _| s != code);
        Ok(removed)
    }

    fn remove_material(&self, id: MaterialId) -> CatalogResult<Material> {
        let mut t = self.write()?;
        let removed = t
            .materials
            .remove(&id)
            .ok_or_else(|| not_found(CatalogEntity::Material, id))?;
        t.norms.retain(|(_, m), _| *m != id);
        Ok(removed)
    }

    fn remove_service_type(&self, name: &ServiceTypeName) -> CatalogResult<ServiceType> {
        let mut t = self.write()?;
        if !t.service_types.contains_key(name) {
            return Err(not_found(CatalogEntity::ServiceType, name));
        }
        if t.services.values().any(|s| s.service_type() == name) {
            return Err(CatalogError::InUse {
                entity: CatalogEntity::ServiceType,
                key: name.to_string(),
                dependents: "services",
            });
        }
        t.service_types
            .remove(name)
            .ok_or_else(|| not_found(CatalogEntity::ServiceType, name))
    }

    fn remove_material_type(&self, name: &MaterialTypeName) -> CatalogResult<MaterialType> {
        let mut t = self.write()?;
        if !t.material_types.contains_key(name) {
            return Err(not_found(CatalogEntity::MaterialType, name));
        }
        if t.materials.values().any(|m| m.material_type() == name) {
            return Err(CatalogError::InUse {
                entity: CatalogEntity::MaterialType,
                key: name.to_string(),
                dependents: "materials",
            });
        }
        t.material_types
            .remove(name)
            .ok_or_else(|| not_found(CatalogEntity::MaterialType, name))
    }
}
