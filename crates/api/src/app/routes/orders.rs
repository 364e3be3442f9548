use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::info;

use costbook_catalog::ServiceCode;
use costbook_core::AggregateId;
use costbook_infra::projections::orders::ORDER_AGGREGATE_TYPE;
use costbook_orders::{Order, OrderCommand, OrderId, PlaceOrder};
use costbook_partners::PartnerId;

use crate::app::{dto::PlaceOrderRequest, errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order))
        .route("/:id", get(get_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<PlaceOrderRequest>,
) -> axum::response::Response {
    let partner_id = match body.partner_id.parse::<AggregateId>() {
        Ok(id) => PartnerId::new(id),
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid partner id"),
    };
    let service_code = match ServiceCode::new(body.service_code) {
        Ok(code) => code,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let execution_date = match NaiveDate::parse_from_str(body.execution_date.trim(), "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_date",
                "execution_date must be formatted as YYYY-MM-DD",
            );
        }
    };

    if services.partners().get(&partner_id).is_none() {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "partner not found");
    }
    match services.catalog().service(&service_code) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return errors::json_error(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("service '{service_code}' not found"),
            );
        }
        Err(e) => return errors::catalog_error_to_response(e),
    }

    let order_id = OrderId::new(AggregateId::new());
    let cmd = OrderCommand::PlaceOrder(PlaceOrder {
        order_id,
        partner_id,
        service_code,
        quantity: body.quantity,
        execution_date,
        occurred_at: Utc::now(),
    });

    match services.dispatch(order_id.0, ORDER_AGGREGATE_TYPE, cmd, |id| Order::empty(OrderId::new(id))) {
        Ok(committed) => {
            info!(order_id = %order_id, partner_id = %partner_id, "order placed");
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": order_id.to_string(),
                    "events_committed": committed.len(),
                })),
            )
                .into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match id.parse::<AggregateId>() {
        Ok(id) => OrderId::new(id),
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };

    match services.orders().get(&order_id) {
        Some(o) => (
            StatusCode::OK,
            Json(json!({
                "id": o.order_id.to_string(),
                "partner_id": o.partner_id.to_string(),
                "service_code": o.service_code,
                "quantity": o.quantity,
                "execution_date": o.execution_date,
            })),
        )
            .into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
    }
}
