use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use costbook_core::AggregateId;
use costbook_infra::projections::partners::PARTNER_AGGREGATE_TYPE;
use costbook_partners::{Partner, PartnerCommand, PartnerDetails, PartnerId, RegisterPartner, UpdatePartner};

use crate::app::{
    dto::{HistoryEntryResponse, ListPartnersQuery, PartnerRequest, PartnerResponse},
    errors,
    services::AppServices,
};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_partners).post(register_partner))
        .route("/:id", get(get_partner).put(update_partner))
        .route("/:id/history", get(partner_history))
}

fn parse_partner_id(id: &str) -> Result<PartnerId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(PartnerId::new)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid partner id"))
}

/// Name and INN must stay unique across partners.
fn check_unique(
    services: &AppServices,
    details: &PartnerDetails,
    except: Option<PartnerId>,
) -> Result<(), axum::response::Response> {
    let directory = services.partners();
    if directory.name_taken(&details.name, except) {
        return Err(errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("a partner named '{}' already exists", details.name),
        ));
    }
    if directory.inn_taken(&details.inn, except) {
        return Err(errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("a partner with INN {} already exists", details.inn),
        ));
    }
    Ok(())
}

pub async fn list_partners(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ListPartnersQuery>,
) -> axum::response::Response {
    let rows = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => services.partners().search_by_name(q),
        None => services.partners().list(),
    };
    let body: Vec<PartnerResponse> = rows.into_iter().map(PartnerResponse::from).collect();
    (StatusCode::OK, Json(body)).into_response()
}

pub async fn register_partner(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PartnerRequest>,
) -> axum::response::Response {
    let details = match body.into_details() {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_unique(&services, &details, None) {
        return resp;
    }

    let partner_id = PartnerId::new(AggregateId::new());
    let cmd = PartnerCommand::RegisterPartner(RegisterPartner {
        partner_id,
        details,
        occurred_at: Utc::now(),
    });

    match services.dispatch(partner_id.0, PARTNER_AGGREGATE_TYPE, cmd, |id| {
        Partner::empty(PartnerId::new(id))
    }) {
        Ok(committed) => {
            info!(partner_id = %partner_id, "partner registered");
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": partner_id.to_string(),
                    "events_committed": committed.len(),
                })),
            )
                .into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_partner(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let partner_id = match parse_partner_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.partners().get(&partner_id) {
        Some(rm) => (StatusCode::OK, Json(PartnerResponse::from(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "partner not found"),
    }
}

pub async fn update_partner(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<PartnerRequest>,
) -> axum::response::Response {
    let partner_id = match parse_partner_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let details = match body.into_details() {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    if let Err(resp) = check_unique(&services, &details, Some(partner_id)) {
        return resp;
    }

    let cmd = PartnerCommand::UpdatePartner(UpdatePartner {
        partner_id,
        details,
        occurred_at: Utc::now(),
    });

    match services.dispatch(partner_id.0, PARTNER_AGGREGATE_TYPE, cmd, |id| {
        Partner::empty(PartnerId::new(id))
    }) {
        Ok(committed) => (
            StatusCode::OK,
            Json(json!({
                "id": partner_id.to_string(),
                "events_committed": committed.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Orders of one partner, newest execution date first, with service names
/// resolved against the current catalog.
pub async fn partner_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let partner_id = match parse_partner_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if services.partners().get(&partner_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "partner not found");
    }

    let mut entries = Vec::new();
    for order in services.orders().history_for(partner_id) {
        let service_name = match services.catalog().service(&order.service_code) {
            Ok(service) => service.map(|s| s.name().to_string()),
            Err(e) => return errors::catalog_error_to_response(e),
        };
        entries.push(HistoryEntryResponse::new(order, service_name));
    }

    (StatusCode::OK, Json(entries)).into_response()
}
