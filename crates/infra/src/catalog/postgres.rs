//! Postgres-backed reference catalog.
//!
//! Tables are created by the migrations under `crates/infra/migrations`.
//! Uniqueness, foreign keys and cascades are enforced by the schema; writes
//! also pre-check them inside the same transaction so the caller gets a
//! typed [`CatalogError`] instead of a raw SQLSTATE.
//!
//! The catalog traits are synchronous. Calls block the current worker via
//! `tokio::task::block_in_place`, so this store must be used from a
//! multi-threaded tokio runtime.

use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::runtime::Handle;
use tracing::instrument;

use costbook_catalog::{
    CatalogEntity, CatalogError, CatalogReader, CatalogResult, CatalogWriter, ConsumptionNorm, Material,
    MaterialId, MaterialType, MaterialTypeName, Service, ServiceCode, ServiceType, ServiceTypeName,
};

#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(8).connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&*self.pool).await
    }

    fn block_on<T, F>(&self, fut: F) -> CatalogResult<T>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        let handle =
            Handle::try_current().map_err(|_| CatalogError::Backend("no tokio runtime available".to_string()))?;
        tokio::task::block_in_place(|| handle.block_on(fut))
    }
}

fn backend(err: sqlx::Error) -> CatalogError {
    CatalogError::Backend(err.to_string())
}

/// Map a failed INSERT/UPDATE. Pre-checks make these rare; they remain for
/// writes racing each other.
fn write_error(entity: CatalogEntity, key: impl ToString, err: sqlx::Error) -> CatalogError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => {
                return CatalogError::Duplicate {
                    entity,
                    key: key.to_string(),
                };
            }
            Some("23514") => {
                return CatalogError::Invalid(costbook_core::DomainError::validation(db.message().to_string()));
            }
            _ => {}
        }
    }
    backend(err)
}

fn not_found(entity: CatalogEntity, key: impl ToString) -> CatalogError {
    CatalogError::NotFound {
        entity,
        key: key.to_string(),
    }
}

fn in_use(entity: CatalogEntity, key: impl ToString, dependents: &'static str) -> CatalogError {
    CatalogError::InUse {
        entity,
        key: key.to_string(),
        dependents,
    }
}

async fn text_exists(tx: &mut Transaction<'_, Postgres>, sql: &'static str, key: &str) -> CatalogResult<bool> {
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(&mut **tx)
        .await
        .map_err(backend)?;
    Ok(row.is_some())
}

async fn id_exists(tx: &mut Transaction<'_, Postgres>, sql: &'static str, key: i32) -> CatalogResult<bool> {
    let row = sqlx::query(sql)
        .bind(key)
        .fetch_optional(&mut **tx)
        .await
        .map_err(backend)?;
    Ok(row.is_some())
}

fn service_type_from_row(row: &PgRow) -> CatalogResult<ServiceType> {
    let name: String = row.try_get("type_name").map_err(backend)?;
    let coefficient: Decimal = row.try_get("complexity_coefficient").map_err(backend)?;
    Ok(ServiceType::new(ServiceTypeName::new(name)?, coefficient)?)
}

fn material_type_from_row(row: &PgRow) -> CatalogResult<MaterialType> {
    let name: String = row.try_get("type_name").map_err(backend)?;
    let percent: Decimal = row.try_get("overconsumption_percent").map_err(backend)?;
    Ok(MaterialType::new(MaterialTypeName::new(name)?, percent)?)
}

fn service_from_row(row: &PgRow) -> CatalogResult<Service> {
    let code: String = row.try_get("service_code").map_err(backend)?;
    let type_name: String = row.try_get("type_name").map_err(backend)?;
    let name: String = row.try_get("service_name").map_err(backend)?;
    Ok(Service::new(
        ServiceCode::new(code)?,
        ServiceTypeName::new(type_name)?,
        name,
        row.try_get("min_cost").map_err(backend)?,
        row.try_get("time_norm_hours").map_err(backend)?,
        row.try_get("hourly_rate").map_err(backend)?,
    )?)
}

fn material_from_row(row: &PgRow) -> CatalogResult<Material> {
    let id: i32 = row.try_get("material_id").map_err(backend)?;
    let type_name: String = row.try_get("type_name").map_err(backend)?;
    let name: String = row.try_get("material_name").map_err(backend)?;
    let price: Decimal = row.try_get("current_price").map_err(backend)?;
    Ok(Material::new(MaterialId::new(id)?, MaterialTypeName::new(type_name)?, name, price)?)
}

fn norm_from_row(row: &PgRow) -> CatalogResult<ConsumptionNorm> {
    let code: String = row.try_get("service_code").map_err(backend)?;
    let id: i32 = row.try_get("material_id").map_err(backend)?;
    let norm: Decimal = row.try_get("consumption_norm").map_err(backend)?;
    Ok(ConsumptionNorm::new(ServiceCode::new(code)?, MaterialId::new(id)?, norm)?)
}

const SERVICE_COLUMNS: &str = "service_code, type_name, service_name, min_cost, time_norm_hours, hourly_rate";
const MATERIAL_COLUMNS: &str = "material_id, type_name, material_name, current_price";

impl CatalogReader for PostgresCatalogStore {
    #[instrument(skip(self), fields(service_type = %name), err)]
    fn service_type(&self, name: &ServiceTypeName) -> CatalogResult<Option<ServiceType>> {
        self.block_on(async {
            let row = sqlx::query(
                "SELECT type_name, complexity_coefficient FROM service_types WHERE type_name = $1",
            )
            .bind(name.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
            row.as_ref().map(service_type_from_row).transpose()
        })
    }

    #[instrument(skip(self), fields(material_type = %name), err)]
    fn material_type(&self, name: &MaterialTypeName) -> CatalogResult<Option<MaterialType>> {
        self.block_on(async {
            let row = sqlx::query(
                "SELECT type_name, overconsumption_percent FROM material_types WHERE type_name = $1",
            )
            .bind(name.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?;
            row.as_ref().map(material_type_from_row).transpose()
        })
    }

    #[instrument(skip(self), fields(service_code = %code), err)]
    fn service(&self, code: &ServiceCode) -> CatalogResult<Option<Service>> {
        self.block_on(async {
            let row = sqlx::query(&format!("SELECT {SERVICE_COLUMNS} FROM services WHERE service_code = $1"))
                .bind(code.as_str())
                .fetch_optional(&*self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(service_from_row).transpose()
        })
    }

    #[instrument(skip(self), fields(material_id = %id), err)]
    fn material(&self, id: MaterialId) -> CatalogResult<Option<Material>> {
        self.block_on(async {
            let row = sqlx::query(&format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE material_id = $1"))
                .bind(id.get())
                .fetch_optional(&*self.pool)
                .await
                .map_err(backend)?;
            row.as_ref().map(material_from_row).transpose()
        })
    }

    #[instrument(skip(self), fields(service_code = %code), err)]
    fn consumption_norms(&self, code: &ServiceCode) -> CatalogResult<Vec<ConsumptionNorm>> {
        self.block_on(async {
            let rows = sqlx::query(
                r#"
                SELECT service_code, material_id, consumption_norm
                FROM service_materials
                WHERE service_code = $1
                ORDER BY material_id ASC
                "#,
            )
            .bind(code.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(backend)?;
            rows.iter().map(norm_from_row).collect()
        })
    }

    fn service_types(&self) -> CatalogResult<Vec<ServiceType>> {
        self.block_on(async {
            let rows = sqlx::query("SELECT type_name, complexity_coefficient FROM service_types ORDER BY type_name")
                .fetch_all(&*self.pool)
                .await
                .map_err(backend)?;
            rows.iter().map(service_type_from_row).collect()
        })
    }

    fn material_types(&self) -> CatalogResult<Vec<MaterialType>> {
        self.block_on(async {
            let rows =
                sqlx::query("SELECT type_name, overconsumption_percent FROM material_types ORDER BY type_name")
                    .fetch_all(&*self.pool)
                    .await
                    .map_err(backend)?;
            rows.iter().map(material_type_from_row).collect()
        })
    }

    fn services(&self) -> CatalogResult<Vec<Service>> {
        self.block_on(async {
            let rows = sqlx::query(&format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY service_code"))
                .fetch_all(&*self.pool)
                .await
                .map_err(backend)?;
            rows.iter().map(service_from_row).collect()
        })
    }

    fn materials(&self) -> CatalogResult<Vec<Material>> {
        self.block_on(async {
            let rows = sqlx::query(&format!("SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY material_id"))
                .fetch_all(&*self.pool)
                .await
                .map_err(backend)?;
            rows.iter().map(material_from_row).collect()
        })
    }
}

impl CatalogWriter for PostgresCatalogStore {
    #[instrument(skip_all, fields(service_type = %service_type.name()), err)]
    fn insert_service_type(&self, service_type: ServiceType) -> CatalogResult<()> {
        let key = service_type.name().to_string();
        self.block_on(async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            if text_exists(&mut tx, "SELECT 1 FROM service_types WHERE type_name = $1", &key).await? {
                return Err(CatalogError::Duplicate {
                    entity: CatalogEntity::ServiceType,
                    key,
                });
            }
            sqlx::query("INSERT INTO service_types (type_name, complexity_coefficient) VALUES ($1, $2)")
                .bind(&key)
                .bind(service_type.complexity_coefficient())
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error(CatalogEntity::ServiceType, &key, e))?;
            tx.commit().await.map_err(backend)
        })
    }

    #[instrument(skip_all, fields(material_type = %material_type.name()), err)]
    fn insert_material_type(&self, material_type: MaterialType) -> CatalogResult<()> {
        let key = material_type.name().to_string();
        self.block_on(async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            if text_exists(&mut tx, "SELECT 1 FROM material_types WHERE type_name = $1", &key).await? {
                return Err(CatalogError::Duplicate {
                    entity: CatalogEntity::MaterialType,
                    key,
                });
            }
            sqlx::query("INSERT INTO material_types (type_name, overconsumption_percent) VALUES ($1, $2)")
                .bind(&key)
                .bind(material_type.overconsumption_percent())
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error(CatalogEntity::MaterialType, &key, e))?;
            tx.commit().await.map_err(backend)
        })
    }

    #[instrument(skip_all, fields(service_code = %service.code()), err)]
    fn insert_service(&self, service: Service) -> CatalogResult<()> {
        self.block_on(async {
            let code = service.code().as_str();
            let mut tx = self.pool.begin().await.map_err(backend)?;
            if text_exists(&mut tx, "SELECT 1 FROM services WHERE service_code = $1", code).await? {
                return Err(CatalogError::Duplicate {
                    entity: CatalogEntity::Service,
                    key: code.to_string(),
                });
            }
            if text_exists(&mut tx, "SELECT 1 FROM services WHERE service_name = $1", service.name()).await? {
                return Err(CatalogError::Duplicate {
                    entity: CatalogEntity::Service,
                    key: service.name().to_string(),
                });
            }
            let type_name = service.service_type().as_str();
            if !text_exists(&mut tx, "SELECT 1 FROM service_types WHERE type_name = $1", type_name).await? {
                return Err(CatalogError::MissingReference {
                    entity: CatalogEntity::ServiceType,
                    key: type_name.to_string(),
                });
            }
            sqlx::query(&format!(
                "INSERT INTO services ({SERVICE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            ))
            .bind(code)
            .bind(type_name)
            .bind(service.name())
            .bind(service.min_cost())
            .bind(service.time_norm_hours())
            .bind(service.hourly_rate())
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(CatalogEntity::Service, code, e))?;
            tx.commit().await.map_err(backend)
        })
    }

    #[instrument(skip_all, fields(material_id = %material.id_typed()), err)]
    fn insert_material(&self, material: Material) -> CatalogResult<()> {
        self.block_on(async {
            let id = material.id_typed();
            let mut tx = self.pool.begin().await.map_err(backend)?;
            if id_exists(&mut tx, "SELECT 1 FROM materials WHERE material_id = $1", id.get()).await? {
                return Err(CatalogError::Duplicate {
                    entity: CatalogEntity::Material,
                    key: id.to_string(),
                });
            }
            if text_exists(&mut tx, "SELECT 1 FROM materials WHERE material_name = $1", material.name()).await? {
                return Err(CatalogError::Duplicate {
                    entity: CatalogEntity::Material,
                    key: material.name().to_string(),
                });
            }
            let type_name = material.material_type().as_str();
            if !text_exists(&mut tx, "SELECT 1 FROM material_types WHERE type_name = $1", type_name).await? {
                return Err(CatalogError::MissingReference {
                    entity: CatalogEntity::MaterialType,
                    key: type_name.to_string(),
                });
            }
            sqlx::query(&format!("INSERT INTO materials ({MATERIAL_COLUMNS}) VALUES ($1, $2, $3, $4)"))
                .bind(id.get())
                .bind(type_name)
                .bind(material.name())
                .bind(material.current_price())
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error(CatalogEntity::Material, id, e))?;
            tx.commit().await.map_err(backend)
        })
    }

    #[instrument(
        skip_all,
        fields(service_code = %norm.service_code(), material_id = %norm.material_id()),
        err
    )]
    fn insert_consumption_norm(&self, norm: ConsumptionNorm) -> CatalogResult<()> {
        self.block_on(async {
            let code = norm.service_code().as_str();
            let id = norm.material_id();
            let key = format!("{code}/{id}");
            let mut tx = self.pool.begin().await.map_err(backend)?;

            let duplicate = sqlx::query("SELECT 1 FROM service_materials WHERE service_code = $1 AND material_id = $2")
                .bind(code)
                .bind(id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
            if duplicate.is_some() {
                return Err(CatalogError::Duplicate {
                    entity: CatalogEntity::ConsumptionNorm,
                    key,
                });
            }
            if !text_exists(&mut tx, "SELECT 1 FROM services WHERE service_code = $1", code).await? {
                return Err(CatalogError::MissingReference {
                    entity: CatalogEntity::Service,
                    key: code.to_string(),
                });
            }
            if !id_exists(&mut tx, "SELECT 1 FROM materials WHERE material_id = $1", id.get()).await? {
                return Err(CatalogError::MissingReference {
                    entity: CatalogEntity::Material,
                    key: id.to_string(),
                });
            }
            sqlx::query(
                "INSERT INTO service_materials (service_code, material_id, consumption_norm) VALUES ($1, $2, $3)",
            )
            .bind(code)
            .bind(id.get())
            .bind(norm.consumption_norm())
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(CatalogEntity::ConsumptionNorm, &key, e))?;
            tx.commit().await.map_err(backend)
        })
    }

    #[instrument(skip(self), fields(material_id = %id), err)]
    fn update_material_price(&self, id: MaterialId, current_price: Decimal) -> CatalogResult<Material> {
        self.block_on(async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            let row = sqlx::query(&format!(
                "SELECT {MATERIAL_COLUMNS} FROM materials WHERE material_id = $1 FOR UPDATE"
            ))
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?
            .ok_or_else(|| not_found(CatalogEntity::Material, id))?;

            let updated = material_from_row(&row)?.with_current_price(current_price)?;
            sqlx::query("UPDATE materials SET current_price = $2 WHERE material_id = $1")
                .bind(id.get())
                .bind(updated.current_price())
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error(CatalogEntity::Material, id, e))?;
            tx.commit().await.map_err(backend)?;
            Ok(updated)
        })
    }

    #[instrument(skip(self), fields(service_code = %code), err)]
    fn remove_service(&self, code: &ServiceCode) -> CatalogResult<Service> {
        self.block_on(async {
            let row = sqlx::query(&format!(
                "DELETE FROM services WHERE service_code = $1 RETURNING {SERVICE_COLUMNS}"
            ))
            .bind(code.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| not_found(CatalogEntity::Service, code))?;
            service_from_row(&row)
        })
    }

    #[instrument(skip(self), fields(material_id = %id), err)]
    fn remove_material(&self, id: MaterialId) -> CatalogResult<Material> {
        self.block_on(async {
            let row = sqlx::query(&format!(
                "DELETE FROM materials WHERE material_id = $1 RETURNING {MATERIAL_COLUMNS}"
            ))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| not_found(CatalogEntity::Material, id))?;
            material_from_row(&row)
        })
    }

    #[instrument(skip(self), fields(service_type = %name), err)]
    fn remove_service_type(&self, name: &ServiceTypeName) -> CatalogResult<ServiceType> {
        self.block_on(async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            if text_exists(&mut tx, "SELECT 1 FROM services WHERE type_name = $1 LIMIT 1", name.as_str()).await? {
                return Err(in_use(CatalogEntity::ServiceType, name, "services"));
            }
            let row = sqlx::query(
                "DELETE FROM service_types WHERE type_name = $1 RETURNING type_name, complexity_coefficient",
            )
            .bind(name.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?
            .ok_or_else(|| not_found(CatalogEntity::ServiceType, name))?;
            let removed = service_type_from_row(&row)?;
            tx.commit().await.map_err(backend)?;
            Ok(removed)
        })
    }

    #[instrument(skip(self), fields(material_type = %name), err)]
    fn remove_material_type(&self, name: &MaterialTypeName) -> CatalogResult<MaterialType> {
        self.block_on(async {
            let mut tx = self.pool.begin().await.map_err(backend)?;
            if text_exists(&mut tx, "SELECT 1 FROM materials WHERE type_name = $1 LIMIT 1", name.as_str()).await? {
                return Err(in_use(CatalogEntity::MaterialType, name, "materials"));
            }
            let row = sqlx::query(
                "DELETE FROM material_types WHERE type_name = $1 RETURNING type_name, overconsumption_percent",
            )
            .bind(name.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?
            .ok_or_else(|| not_found(CatalogEntity::MaterialType, name))?;
            let removed = material_type_from_row(&row)?;
            tx.commit().await.map_err(backend)?;
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    //! Run against a scratch database: `TEST_DATABASE_URL=postgres://... cargo test -p costbook-infra`.
    //! Skipped when the variable is unset.

    use super::*;
    use rust_decimal_macros::dec;

    async fn store() -> Option<PostgresCatalogStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let store = PostgresCatalogStore::connect(&url).await.ok()?;
        store.migrate().await.ok()?;
        sqlx::query("TRUNCATE service_materials, services, materials, service_types, material_types")
            .execute(&*store.pool)
            .await
            .ok()?;
        Some(store)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn round_trips_and_cascades() {
        let Some(c) = store().await else {
            return;
        };
        let st = ServiceTypeName::new("Repair").unwrap();
        let mt = MaterialTypeName::new("Paint").unwrap();
        let code = ServiceCode::new("S1").unwrap();
        let mid = MaterialId::new(1).unwrap();

        c.insert_service_type(ServiceType::new(st.clone(), dec!(1.5)).unwrap()).unwrap();
        c.insert_material_type(MaterialType::new(mt.clone(), dec!(0.10)).unwrap()).unwrap();
        c.insert_service(Service::new(code.clone(), st.clone(), "Painting", dec!(900), dec!(2), dec!(500)).unwrap())
            .unwrap();
        c.insert_material(Material::new(mid, mt.clone(), "White paint", dec!(50)).unwrap())
            .unwrap();
        c.insert_consumption_norm(ConsumptionNorm::new(code.clone(), mid, dec!(4)).unwrap())
            .unwrap();

        assert_eq!(c.service(&code).unwrap().unwrap().name(), "Painting");
        assert_eq!(c.consumption_norms(&code).unwrap().len(), 1);
        assert!(matches!(
            c.insert_service_type(ServiceType::new(st.clone(), dec!(2)).unwrap()),
            Err(CatalogError::Duplicate { .. })
        ));
        assert!(matches!(c.remove_service_type(&st), Err(CatalogError::InUse { .. })));

        c.remove_material(mid).unwrap();
        assert!(c.consumption_norms(&code).unwrap().is_empty());
    }
}
