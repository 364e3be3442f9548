//! Read-only catalog listings.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use costbook_catalog::CatalogResult;

use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/service-types", get(list_service_types))
        .route("/material-types", get(list_material_types))
        .route("/services", get(list_services))
        .route("/materials", get(list_materials))
}

fn listing<T: Serialize>(rows: CatalogResult<Vec<T>>) -> axum::response::Response {
    match rows {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_service_types(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    listing(services.catalog().service_types())
}

pub async fn list_material_types(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    listing(services.catalog().material_types())
}

pub async fn list_services(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    listing(services.catalog().services())
}

pub async fn list_materials(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    listing(services.catalog().materials())
}
