use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use costbook_catalog::{CatalogEntity, CatalogReader, MaterialTypeName, ServiceTypeName};

use crate::error::{CostingError, CostingResult};

/// Whole units of a material type to purchase for `quantity` units of work
/// of `service_type`, each sized by `service_params`:
///
/// `ceil(service_params × complexity_coefficient × quantity × (1 + overconsumption_percent))`
///
/// The result is always rounded up.
pub fn compute_material_quantity<C>(
    catalog: &C,
    service_type: &ServiceTypeName,
    material_type: &MaterialTypeName,
    quantity: i64,
    service_params: f64,
) -> CostingResult<u64>
where
    C: CatalogReader + ?Sized,
{
    if quantity <= 0 {
        return Err(CostingError::invalid_input(format!(
            "quantity must be a positive integer (got {quantity})"
        )));
    }
    let params = positive_decimal(service_params)?;

    let service_type = catalog
        .service_type(service_type)?
        .ok_or_else(|| CostingError::not_found(CatalogEntity::ServiceType, service_type))?;
    let material_type = catalog
        .material_type(material_type)?
        .ok_or_else(|| CostingError::not_found(CatalogEntity::MaterialType, material_type))?;

    let total = params
        .checked_mul(service_type.complexity_coefficient())
        .and_then(|base| base.checked_mul(Decimal::from(quantity)))
        .and_then(|q| q.checked_mul(Decimal::ONE + material_type.overconsumption_percent()))
        .ok_or_else(|| CostingError::invalid_input("material quantity is out of range"))?;

    // Every factor is positive, so any work needs at least one unit even when
    // the product underflows the decimal scale.
    total
        .ceil()
        .max(Decimal::ONE)
        .to_u64()
        .ok_or_else(|| CostingError::invalid_input("material quantity is out of range"))
}

/// Accepts a number only when it has no fractional part, so `3.0` passes
/// and `2.5` is rejected. Sign is left to the calculation to check.
pub fn whole_quantity(value: f64) -> CostingResult<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(CostingError::invalid_input(format!(
            "quantity must be an integer (got {value})"
        )));
    }
    value
        .to_i64()
        .ok_or_else(|| CostingError::invalid_input(format!("quantity {value} is out of range")))
}

/// Values below the smallest decimal step come back as zero; the caller
/// still asks for at least one unit.
fn positive_decimal(value: f64) -> CostingResult<Decimal> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CostingError::invalid_input(format!(
            "service_params must be a positive number (got {value})"
        )));
    }
    match Decimal::from_f64(value) {
        Some(d) => Ok(d),
        None if value < 1.0 => Ok(Decimal::ZERO),
        None => Err(CostingError::invalid_input(format!(
            "service_params {value} is out of range"
        ))),
    }
}
