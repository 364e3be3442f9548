use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::warn;

use costbook_catalog::{MaterialTypeName, ServiceCode, ServiceTypeName};
use costbook_costing::{compute_material_quantity, service_cost_breakdown, whole_quantity};

use crate::app::{
    dto::{MaterialQuantityRequest, MaterialQuantityResponse, ServiceCostResponse},
    errors,
    services::AppServices,
};

pub fn router() -> Router {
    Router::new()
        .route("/services/:code", get(service_cost))
        .route("/material-quantity", post(material_quantity))
}

pub async fn service_cost(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    // A code that cannot exist (blank, over 10 chars) is a malformed request:
    // 400 validation_error. Well-formed but unknown codes get 404 below.
    let code = match ServiceCode::new(code) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match service_cost_breakdown(services.catalog(), &code) {
        Ok(breakdown) => (StatusCode::OK, Json(ServiceCostResponse::from(breakdown))).into_response(),
        Err(e) => {
            warn!(service_code = %code, error = %e, "service cost calculation failed");
            errors::costing_error_to_response(e)
        }
    }
}

pub async fn material_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<MaterialQuantityRequest>,
) -> axum::response::Response {
    let service_type = match ServiceTypeName::new(body.service_type) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let material_type = match MaterialTypeName::new(body.material_type) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let result = whole_quantity(body.quantity).and_then(|quantity| {
        compute_material_quantity(
            services.catalog(),
            &service_type,
            &material_type,
            quantity,
            body.service_params,
        )
    });

    match result {
        Ok(quantity) => (StatusCode::OK, Json(MaterialQuantityResponse { quantity })).into_response(),
        Err(e) => {
            warn!(
                service_type = %service_type,
                material_type = %material_type,
                error = %e,
                "material quantity calculation failed"
            );
            errors::costing_error_to_response(e)
        }
    }
}
