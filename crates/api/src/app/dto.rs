use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use costbook_catalog::ServiceCode;
use costbook_costing::ServiceCostBreakdown;
use costbook_infra::projections::{OrderReadModel, PartnerReadModel};
use costbook_partners::PartnerDetails;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Body of both `POST /partners` and `PUT /partners/:id`.
#[derive(Debug, Deserialize)]
pub struct PartnerRequest {
    /// One of `ИП`, `ООО`, `ЗАО`.
    pub partner_type: String,
    pub name: String,
    pub manager: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub inn: String,
    #[serde(default)]
    pub rating: i32,
}

impl PartnerRequest {
    /// Parsed and validated details, text fields trimmed.
    pub fn into_details(self) -> Result<PartnerDetails, axum::response::Response> {
        let partner_type = self.partner_type.parse().map_err(errors::domain_error_to_response)?;
        PartnerDetails {
            partner_type,
            name: self.name,
            manager: self.manager,
            email: self.email,
            phone: self.phone,
            address: self.address,
            inn: self.inn,
            rating: self.rating,
        }
        .validated()
        .map_err(errors::domain_error_to_response)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPartnersQuery {
    /// Case-insensitive name substring.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub partner_id: String,
    pub service_code: String,
    pub quantity: i64,
    /// `YYYY-MM-DD`
    pub execution_date: String,
}

#[derive(Debug, Deserialize)]
pub struct MaterialQuantityRequest {
    pub service_type: String,
    pub material_type: String,
    /// Must be a whole number; `2.5` is rejected.
    pub quantity: f64,
    pub service_params: f64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct PartnerResponse {
    pub id: String,
    pub partner_type: &'static str,
    pub name: String,
    pub manager: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub inn: String,
    pub rating: i32,
}

impl From<PartnerReadModel> for PartnerResponse {
    fn from(rm: PartnerReadModel) -> Self {
        Self {
            id: rm.partner_id.to_string(),
            partner_type: rm.partner_type.label(),
            name: rm.name,
            manager: rm.manager,
            email: rm.email,
            phone: rm.phone,
            address: rm.address,
            inn: rm.inn,
            rating: rm.rating,
        }
    }
}

/// One row of a partner's service history.
#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub order_id: String,
    pub service_code: ServiceCode,
    /// `None` once the service has been removed from the catalog.
    pub service_name: Option<String>,
    pub quantity: i64,
    pub execution_date: NaiveDate,
}

impl HistoryEntryResponse {
    pub fn new(order: OrderReadModel, service_name: Option<String>) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            service_code: order.service_code,
            service_name,
            quantity: order.quantity,
            execution_date: order.execution_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceCostResponse {
    pub service_code: ServiceCode,
    pub service_name: String,
    pub labor_cost: Decimal,
    pub material_cost: Decimal,
    pub total_cost: Decimal,
}

impl From<ServiceCostBreakdown> for ServiceCostResponse {
    fn from(b: ServiceCostBreakdown) -> Self {
        Self {
            service_code: b.service_code,
            service_name: b.service_name,
            labor_cost: b.labor_cost,
            material_cost: b.material_cost,
            total_cost: b.total_cost,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MaterialQuantityResponse {
    pub quantity: u64,
}
