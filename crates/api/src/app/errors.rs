use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use costbook_catalog::CatalogError;
use costbook_core::DomainError;
use costbook_costing::CostingError;
use costbook_infra::command_dispatcher::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    dispatch_error_to_response(err.into())
}

pub fn costing_error_to_response(err: CostingError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        CostingError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
        CostingError::NoMaterials { .. } => json_error(StatusCode::UNPROCESSABLE_ENTITY, "no_materials", message),
        CostingError::InvalidInput(_) => json_error(StatusCode::BAD_REQUEST, "invalid_input", message),
        CostingError::IntegrityViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "integrity_violation", message)
        }
        CostingError::Store(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message),
    }
}

/// Catalog reads from handlers only fail when the backend does.
pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
