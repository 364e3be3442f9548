//! Demo catalog served when no database is configured.

use rust_decimal::Decimal;

use costbook_catalog::{
    CatalogResult, CatalogWriter, ConsumptionNorm, InMemoryCatalog, Material, MaterialId, MaterialType,
    MaterialTypeName, Service, ServiceCode, ServiceType, ServiceTypeName,
};

/// Two service types, two material types, three services and their norms.
///
/// `S3` deliberately has no consumption norms.
pub fn demo_catalog() -> CatalogResult<InMemoryCatalog> {
    let catalog = InMemoryCatalog::new();

    let audit = ServiceTypeName::new("Audit")?;
    let consulting = ServiceTypeName::new("Consulting")?;
    catalog.insert_service_type(ServiceType::new(audit.clone(), Decimal::new(15, 1))?)?;
    catalog.insert_service_type(ServiceType::new(consulting.clone(), Decimal::new(12, 1))?)?;

    let paper = MaterialTypeName::new("Paper")?;
    let toner = MaterialTypeName::new("Toner")?;
    catalog.insert_material_type(MaterialType::new(paper.clone(), Decimal::new(10, 2))?)?;
    catalog.insert_material_type(MaterialType::new(toner.clone(), Decimal::new(5, 2))?)?;

    let a4 = MaterialId::new(1)?;
    let cartridge = MaterialId::new(2)?;
    catalog.insert_material(Material::new(a4, paper, "A4 paper pack", Decimal::new(5000, 2))?)?;
    catalog.insert_material(Material::new(cartridge, toner, "Toner cartridge", Decimal::new(125050, 2))?)?;

    let s1 = ServiceCode::new("S1")?;
    let s2 = ServiceCode::new("S2")?;
    catalog.insert_service(Service::new(
        s1.clone(),
        audit,
        "Annual audit",
        Decimal::new(100000, 2),
        Decimal::new(200, 2),
        Decimal::new(50000, 2),
    )?)?;
    catalog.insert_service(Service::new(
        s2.clone(),
        consulting.clone(),
        "Tax consulting",
        Decimal::new(50000, 2),
        Decimal::new(150, 2),
        Decimal::new(80000, 2),
    )?)?;
    catalog.insert_service(Service::new(
        ServiceCode::new("S3")?,
        consulting,
        "Express review",
        Decimal::new(20000, 2),
        Decimal::new(50, 2),
        Decimal::new(60000, 2),
    )?)?;

    catalog.insert_consumption_norm(ConsumptionNorm::new(s1, a4, Decimal::new(4, 0))?)?;
    catalog.insert_consumption_norm(ConsumptionNorm::new(s2.clone(), a4, Decimal::new(2, 0))?)?;
    catalog.insert_consumption_norm(ConsumptionNorm::new(s2, cartridge, Decimal::new(5, 1))?)?;

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use costbook_catalog::CatalogReader;
    use costbook_costing::compute_service_cost;

    #[test]
    fn demo_catalog_prices_out() {
        let catalog = demo_catalog().unwrap();
        assert_eq!(catalog.services().unwrap().len(), 3);

        let s1 = compute_service_cost(&catalog, &ServiceCode::new("S1").unwrap()).unwrap();
        assert_eq!(s1.to_string(), "1200.00");

        let s2 = compute_service_cost(&catalog, &ServiceCode::new("S2").unwrap()).unwrap();
        assert_eq!(s2.to_string(), "1925.25");
    }
}
