//! Service types and services.

use rust_decimal::Decimal;
use serde::Serialize;

use costbook_core::{DomainResult, Entity};

use crate::ids::{ServiceCode, ServiceTypeName};
use crate::validate;

/// A category of services sharing a complexity coefficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceType {
    name: ServiceTypeName,
    complexity_coefficient: Decimal,
}

impl ServiceType {
    /// The coefficient is stored as `NUMERIC(3,1)`: positive, one decimal
    /// place, below 100.
    pub fn new(name: ServiceTypeName, complexity_coefficient: Decimal) -> DomainResult<Self> {
        validate::positive("complexity_coefficient", complexity_coefficient)?;
        let complexity_coefficient = validate::fits_numeric(
            "complexity_coefficient",
            complexity_coefficient,
            1,
            Decimal::ONE_HUNDRED,
        )?;
        Ok(Self {
            name,
            complexity_coefficient,
        })
    }

    pub fn name(&self) -> &ServiceTypeName {
        &self.name
    }

    pub fn complexity_coefficient(&self) -> Decimal {
        self.complexity_coefficient
    }
}

impl Entity for ServiceType {
    type Id = ServiceTypeName;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

/// A sellable unit of work with a labor-time norm and an hourly rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    code: ServiceCode,
    service_type: ServiceTypeName,
    name: String,
    min_cost: Decimal,
    time_norm_hours: Decimal,
    hourly_rate: Decimal,
}

impl Service {
    pub fn new(
        code: ServiceCode,
        service_type: ServiceTypeName,
        name: impl Into<String>,
        min_cost: Decimal,
        time_norm_hours: Decimal,
        hourly_rate: Decimal,
    ) -> DomainResult<Self> {
        let name = validate::display_name("service name", name.into(), 100)?;

        validate::positive("min_cost", min_cost)?;
        validate::positive("time_norm_hours", time_norm_hours)?;
        validate::positive("hourly_rate", hourly_rate)?;

        let min_cost = validate::fits_numeric("min_cost", min_cost, 2, Decimal::from(100_000_000))?;
        let time_norm_hours =
            validate::fits_numeric("time_norm_hours", time_norm_hours, 2, Decimal::from(1_000))?;
        let hourly_rate =
            validate::fits_numeric("hourly_rate", hourly_rate, 2, Decimal::from(100_000_000))?;

        Ok(Self {
            code,
            service_type,
            name,
            min_cost,
            time_norm_hours,
            hourly_rate,
        })
    }

    pub fn code(&self) -> &ServiceCode {
        &self.code
    }

    pub fn service_type(&self) -> &ServiceTypeName {
        &self.service_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_cost(&self) -> Decimal {
        self.min_cost
    }

    pub fn time_norm_hours(&self) -> Decimal {
        self.time_norm_hours
    }

    pub fn hourly_rate(&self) -> Decimal {
        self.hourly_rate
    }
}

impl Entity for Service {
    type Id = ServiceCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}
