use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use costbook_catalog::{CatalogEntity, CatalogReader, MaterialId, ServiceCode};

use crate::error::{CostingError, CostingResult};

/// Fractional digits kept in a service cost.
pub const COST_SCALE: u32 = 2;

/// Round half-up. Costs are never negative, so "away from zero" and "up"
/// coincide: 0.125 becomes 0.13, not the banker's 0.12.
pub const COST_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// One bill-of-materials row priced at the material's current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialCostLine {
    pub material_id: MaterialId,
    pub material_name: String,
    pub consumption_norm: Decimal,
    pub unit_price: Decimal,
    /// `consumption_norm × unit_price`, unrounded.
    pub cost: Decimal,
}

/// Cost of one unit of a service, with its parts.
///
/// `labor_cost` and `material_cost` are exact; only `total_cost` is rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCostBreakdown {
    pub service_code: ServiceCode,
    pub service_name: String,
    pub labor_cost: Decimal,
    pub material_cost: Decimal,
    pub total_cost: Decimal,
    pub lines: Vec<MaterialCostLine>,
}

/// Total cost of producing one unit of `code`:
/// `time_norm_hours × hourly_rate + Σ consumption_norm × current_price`,
/// rounded half-up to [`COST_SCALE`] places.
pub fn compute_service_cost<C>(catalog: &C, code: &ServiceCode) -> CostingResult<Decimal>
where
    C: CatalogReader + ?Sized,
{
    service_cost_breakdown(catalog, code).map(|b| b.total_cost)
}

/// Same calculation as [`compute_service_cost`], keeping the parts.
pub fn service_cost_breakdown<C>(catalog: &C, code: &ServiceCode) -> CostingResult<ServiceCostBreakdown>
where
    C: CatalogReader + ?Sized,
{
    let service = catalog
        .service(code)?
        .ok_or_else(|| CostingError::not_found(CatalogEntity::Service, code))?;

    let labor_cost = service
        .time_norm_hours()
        .checked_mul(service.hourly_rate())
        .ok_or_else(|| overflow(code, "labor cost"))?;

    let norms = catalog.consumption_norms(code)?;
    if norms.is_empty() {
        return Err(CostingError::NoMaterials {
            service_code: code.to_string(),
        });
    }

    let mut lines = Vec::with_capacity(norms.len());
    let mut material_cost = Decimal::ZERO;
    for norm in &norms {
        let material = catalog.material(norm.material_id())?.ok_or_else(|| {
            CostingError::IntegrityViolation(format!(
                "service '{}' consumes material {} which does not exist",
                code,
                norm.material_id()
            ))
        })?;

        let cost = norm
            .consumption_norm()
            .checked_mul(material.current_price())
            .ok_or_else(|| overflow(code, "material cost"))?;
        material_cost = material_cost
            .checked_add(cost)
            .ok_or_else(|| overflow(code, "material cost"))?;

        lines.push(MaterialCostLine {
            material_id: material.id_typed(),
            material_name: material.name().to_string(),
            consumption_norm: norm.consumption_norm(),
            unit_price: material.current_price(),
            cost,
        });
    }

    let total = labor_cost
        .checked_add(material_cost)
        .ok_or_else(|| overflow(code, "total cost"))?;

    Ok(ServiceCostBreakdown {
        service_code: service.code().clone(),
        service_name: service.name().to_string(),
        labor_cost,
        material_cost,
        total_cost: round_cost(total),
        lines,
    })
}

fn round_cost(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(COST_SCALE, COST_ROUNDING);
    // Always render two places ("1200.00", not "1200").
    rounded.rescale(COST_SCALE);
    rounded
}

/// Every operand comes from the catalog, so an overflow is bad catalog data
/// rather than bad caller input.
fn overflow(code: &ServiceCode, what: &str) -> CostingError {
    CostingError::IntegrityViolation(format!("{what} of service '{code}' overflows"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use costbook_catalog::{
        CatalogResult, CatalogWriter, ConsumptionNorm, InMemoryCatalog, Material, MaterialType,
        MaterialTypeName, Service, ServiceType, ServiceTypeName,
    };
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn code(c: &str) -> ServiceCode {
        ServiceCode::new(c).unwrap()
    }

    fn mid(id: i32) -> MaterialId {
        MaterialId::new(id).unwrap()
    }

    fn base_catalog() -> InMemoryCatalog {
        let c = InMemoryCatalog::new();
        c.insert_service_type(ServiceType::new(ServiceTypeName::new("Finishing").unwrap(), dec!(1.5)).unwrap())
            .unwrap();
        c.insert_material_type(MaterialType::new(MaterialTypeName::new("Paint").unwrap(), dec!(0.10)).unwrap())
            .unwrap();
        c
    }

    fn add_service(c: &InMemoryCatalog, service_code: &str, name: &str, hours: Decimal, rate: Decimal) {
        c.insert_service(
            Service::new(
                code(service_code),
                ServiceTypeName::new("Finishing").unwrap(),
                name,
                dec!(100.00),
                hours,
                rate,
            )
            .unwrap(),
        )
        .unwrap();
    }

    fn add_material(c: &InMemoryCatalog, id: i32, name: &str, price: Decimal) {
        c.insert_material(Material::new(mid(id), MaterialTypeName::new("Paint").unwrap(), name, price).unwrap())
            .unwrap();
    }

    fn link(c: &InMemoryCatalog, service_code: &str, id: i32, norm: Decimal) {
        c.insert_consumption_norm(ConsumptionNorm::new(code(service_code), mid(id), norm).unwrap())
            .unwrap();
    }

    #[test]
    fn labor_plus_materials_example() {
        let c = base_catalog();
        add_service(&c, "S1", "Painting", dec!(2.0), dec!(500.00));
        add_material(&c, 1, "White paint", dec!(50.00));
        link(&c, "S1", 1, dec!(4));

        let b = service_cost_breakdown(&c, &code("S1")).unwrap();
        assert_eq!(b.labor_cost, dec!(1000.00));
        assert_eq!(b.material_cost, dec!(200.00));
        assert_eq!(b.total_cost, dec!(1200.00));
        assert_eq!(b.total_cost.to_string(), "1200.00");
        assert_eq!(compute_service_cost(&c, &code("S1")).unwrap(), dec!(1200.00));
    }

    #[test]
    fn sums_every_consumption_row() {
        let c = base_catalog();
        add_service(&c, "S1", "Painting", dec!(1.5), dec!(300.00));
        add_material(&c, 1, "White paint", dec!(50.00));
        add_material(&c, 2, "Primer", dec!(12.35));
        link(&c, "S1", 1, dec!(2));
        link(&c, "S1", 2, dec!(0.5));

        // 450.00 + 100.00 + 6.175 = 556.175 -> 556.18
        let b = service_cost_breakdown(&c, &code("S1")).unwrap();
        assert_eq!(b.lines.len(), 2);
        assert_eq!(b.material_cost, dec!(106.175));
        assert_eq!(b.total_cost, dec!(556.18));
    }

    #[test]
    fn midpoints_round_half_up() {
        let c = base_catalog();
        add_service(&c, "S1", "Touch-up", dec!(0.25), dec!(0.10));
        add_material(&c, 1, "Brush", dec!(0.10));
        link(&c, "S1", 1, dec!(1));

        // 0.025 + 0.10 = 0.125; half-even would give 0.12.
        assert_eq!(compute_service_cost(&c, &code("S1")).unwrap(), dec!(0.13));
    }

    #[test]
    fn unknown_service_is_not_found() {
        let c = base_catalog();
        let err = compute_service_cost(&c, &code("NOPE")).unwrap_err();
        assert_eq!(
            err,
            CostingError::NotFound {
                entity: CatalogEntity::Service,
                key: "NOPE".to_string()
            }
        );
    }

    #[test]
    fn service_without_materials_is_misconfigured() {
        let c = base_catalog();
        add_service(&c, "S1", "Consulting", dec!(1), dec!(100));
        let err = compute_service_cost(&c, &code("S1")).unwrap_err();
        assert!(matches!(err, CostingError::NoMaterials { service_code } if service_code == "S1"));
    }

    #[test]
    fn removing_the_only_material_leaves_no_materials() {
        let c = base_catalog();
        add_service(&c, "S1", "Painting", dec!(2.0), dec!(500.00));
        add_material(&c, 1, "White paint", dec!(50.00));
        link(&c, "S1", 1, dec!(4));
        c.remove_material(mid(1)).unwrap();

        assert!(matches!(
            compute_service_cost(&c, &code("S1")),
            Err(CostingError::NoMaterials { .. })
        ));
    }

    #[test]
    fn price_changes_are_picked_up_on_next_call() {
        let c = base_catalog();
        add_service(&c, "S1", "Painting", dec!(2.0), dec!(500.00));
        add_material(&c, 1, "White paint", dec!(50.00));
        link(&c, "S1", 1, dec!(4));

        assert_eq!(compute_service_cost(&c, &code("S1")).unwrap(), dec!(1200.00));
        c.update_material_price(mid(1), dec!(75.00)).unwrap();
        assert_eq!(compute_service_cost(&c, &code("S1")).unwrap(), dec!(1300.00));
    }

    /// Reader that returns a consumption row whose material is gone, which a
    /// well-behaved store never does.
    struct DanglingLink {
        inner: InMemoryCatalog,
    }

    impl CatalogReader for DanglingLink {
        fn service_type(&self, name: &ServiceTypeName) -> CatalogResult<Option<ServiceType>> {
            self.inner.service_type(name)
        }
        fn material_type(&self, name: &MaterialTypeName) -> CatalogResult<Option<MaterialType>> {
            self.inner.material_type(name)
        }
        fn service(&self, code: &ServiceCode) -> CatalogResult<Option<Service>> {
            self.inner.service(code)
        }
        fn material(&self, id: MaterialId) -> CatalogResult<Option<Material>> {
            self.inner.material(id)
        }
        fn consumption_norms(&self, code: &ServiceCode) -> CatalogResult<Vec<ConsumptionNorm>> {
            let mut norms = self.inner.consumption_norms(code)?;
            norms.push(ConsumptionNorm::new(code.clone(), mid(404), dec!(1)).unwrap());
            Ok(norms)
        }
        fn service_types(&self) -> CatalogResult<Vec<ServiceType>> {
            self.inner.service_types()
        }
        fn material_types(&self) -> CatalogResult<Vec<MaterialType>> {
            self.inner.material_types()
        }
        fn services(&self) -> CatalogResult<Vec<Service>> {
            self.inner.services()
        }
        fn materials(&self) -> CatalogResult<Vec<Material>> {
            self.inner.materials()
        }
    }

    #[test]
    fn dangling_material_reference_aborts_the_calculation() {
        let inner = base_catalog();
        add_service(&inner, "S1", "Painting", dec!(2.0), dec!(500.00));
        add_material(&inner, 1, "White paint", dec!(50.00));
        link(&inner, "S1", 1, dec!(4));
        let reader = DanglingLink { inner };

        let err = compute_service_cost(&reader, &code("S1")).unwrap_err();
        match err {
            CostingError::IntegrityViolation(msg) => assert!(msg.contains("404")),
            other => panic!("expected integrity violation, got {other:?}"),
        }
    }

    #[test]
    fn overflow_is_reported_against_the_catalog() {
        match overflow(&code("S1"), "total cost") {
            CostingError::IntegrityViolation(msg) => {
                assert_eq!(msg, "total cost of service 'S1' overflows")
            }
            other => panic!("expected integrity violation, got {other:?}"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the cost equals the formula, rounded half-up, and is
        /// stable across repeated calls.
        #[test]
        fn cost_matches_formula(
            hours_cents in 1i64..99_999,
            rate_cents in 1i64..10_000_000,
            rows in prop::collection::vec((1i64..100_000, 1i64..10_000_000), 1..6)
        ) {
            let c = base_catalog();
            let hours = Decimal::new(hours_cents, 2);
            let rate = Decimal::new(rate_cents, 2);
            add_service(&c, "S1", "Generated", hours, rate);

            let mut expected = hours * rate;
            for (idx, (norm_cents, price_cents)) in rows.iter().enumerate() {
                let id = idx as i32 + 1;
                let norm = Decimal::new(*norm_cents, 2);
                let price = Decimal::new(*price_cents, 2);
                add_material(&c, id, &format!("M{id}"), price);
                link(&c, "S1", id, norm);
                expected += norm * price;
            }
            let expected = expected.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

            let first = compute_service_cost(&c, &code("S1")).unwrap();
            let second = compute_service_cost(&c, &code("S1")).unwrap();

            prop_assert!(first >= Decimal::ZERO);
            prop_assert_eq!(first, expected);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.scale(), 2);
        }
    }
}
