//! Material types and materials.

use rust_decimal::Decimal;
use serde::Serialize;

use costbook_core::{DomainResult, Entity};

use crate::ids::{MaterialId, MaterialTypeName};
use crate::validate;

/// A category of materials sharing an overconsumption (waste) allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialType {
    name: MaterialTypeName,
    overconsumption_percent: Decimal,
}

impl MaterialType {
    /// `overconsumption_percent` is a fraction (0.05 = 5%), stored as
    /// `NUMERIC(3,2)`.
    pub fn new(name: MaterialTypeName, overconsumption_percent: Decimal) -> DomainResult<Self> {
        validate::non_negative("overconsumption_percent", overconsumption_percent)?;
        let overconsumption_percent = validate::fits_numeric(
            "overconsumption_percent",
            overconsumption_percent,
            2,
            Decimal::TEN,
        )?;
        Ok(Self {
            name,
            overconsumption_percent,
        })
    }

    pub fn name(&self) -> &MaterialTypeName {
        &self.name
    }

    pub fn overconsumption_percent(&self) -> Decimal {
        self.overconsumption_percent
    }
}

impl Entity for MaterialType {
    type Id = MaterialTypeName;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

/// A purchasable material. `current_price` is today's market price; older
/// prices are not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Material {
    id: MaterialId,
    material_type: MaterialTypeName,
    name: String,
    current_price: Decimal,
}

impl Material {
    pub fn new(
        id: MaterialId,
        material_type: MaterialTypeName,
        name: impl Into<String>,
        current_price: Decimal,
    ) -> DomainResult<Self> {
        let name = validate::display_name("material name", name.into(), 100)?;
        let current_price = Self::check_price(current_price)?;
        Ok(Self {
            id,
            material_type,
            name,
            current_price,
        })
    }

    /// Copy of this material at a new market price.
    pub fn with_current_price(&self, current_price: Decimal) -> DomainResult<Self> {
        let current_price = Self::check_price(current_price)?;
        Ok(Self {
            current_price,
            ..self.clone()
        })
    }

    fn check_price(price: Decimal) -> DomainResult<Decimal> {
        validate::positive("current_price", price)?;
        validate::fits_numeric("current_price", price, 2, Decimal::from(100_000_000))
    }

    pub fn id_typed(&self) -> MaterialId {
        self.id
    }

    pub fn material_type(&self) -> &MaterialTypeName {
        &self.material_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_price(&self) -> Decimal {
        self.current_price
    }
}

impl Entity for Material {
    type Id = MaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costbook_core::DomainError;
    use rust_decimal_macros::dec;

    fn paint(price: Decimal) -> DomainResult<Material> {
        Material::new(
            MaterialId::new(1).unwrap(),
            MaterialTypeName::new("Paint").unwrap(),
            "White paint",
            price,
        )
    }

    #[test]
    fn zero_overconsumption_is_allowed() {
        let mt = MaterialType::new(MaterialTypeName::new("Tile").unwrap(), dec!(0)).unwrap();
        assert_eq!(mt.overconsumption_percent(), Decimal::ZERO);
    }

    #[test]
    fn negative_or_too_precise_overconsumption_is_rejected() {
        let name = MaterialTypeName::new("Tile").unwrap();
        assert!(matches!(MaterialType::new(name.clone(), dec!(-0.01)), Err(DomainError::Validation(_))));
        assert!(matches!(MaterialType::new(name, dec!(0.125)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn price_must_be_positive() {
        assert!(paint(dec!(50.00)).is_ok());
        assert!(matches!(paint(dec!(0)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn repricing_keeps_identity() {
        let m = paint(dec!(50.00)).unwrap();
        let repriced = m.with_current_price(dec!(55.10)).unwrap();
        assert_eq!(repriced.id_typed(), m.id_typed());
        assert_eq!(repriced.name(), m.name());
        assert_eq!(repriced.current_price(), dec!(55.10));
        assert!(m.with_current_price(dec!(-5)).is_err());
    }
}
