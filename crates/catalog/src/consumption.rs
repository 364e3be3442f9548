//! The service × material link carrying a consumption norm.

use rust_decimal::Decimal;
use serde::Serialize;

use costbook_core::{DomainResult, Entity};

use crate::ids::{MaterialId, ServiceCode};
use crate::validate;

/// How much of one material a single unit of one service consumes.
///
/// Identity is the `(service_code, material_id)` pair; a service lists each
/// material at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumptionNorm {
    #[serde(skip)]
    key: (ServiceCode, MaterialId),
    service_code: ServiceCode,
    material_id: MaterialId,
    consumption_norm: Decimal,
}

impl ConsumptionNorm {
    pub fn new(
        service_code: ServiceCode,
        material_id: MaterialId,
        consumption_norm: Decimal,
    ) -> DomainResult<Self> {
        validate::positive("consumption_norm", consumption_norm)?;
        let consumption_norm =
            validate::fits_numeric("consumption_norm", consumption_norm, 2, Decimal::from(100_000_000))?;
        Ok(Self {
            key: (service_code.clone(), material_id),
            service_code,
            material_id,
            consumption_norm,
        })
    }

    pub fn service_code(&self) -> &ServiceCode {
        &self.service_code
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn consumption_norm(&self) -> Decimal {
        self.consumption_norm
    }
}

impl Entity for ConsumptionNorm {
    type Id = (ServiceCode, MaterialId);

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn identity_is_the_service_material_pair() {
        let norm = ConsumptionNorm::new(
            ServiceCode::new("S1").unwrap(),
            MaterialId::new(4).unwrap(),
            dec!(4),
        )
        .unwrap();
        assert_eq!(norm.id(), &(ServiceCode::new("S1").unwrap(), MaterialId::new(4).unwrap()));
    }

    #[test]
    fn norm_must_be_positive() {
        let code = ServiceCode::new("S1").unwrap();
        let id = MaterialId::new(1).unwrap();
        assert!(ConsumptionNorm::new(code.clone(), id, dec!(0)).is_err());
        assert!(ConsumptionNorm::new(code, id, dec!(-2.5)).is_err());
    }
}
