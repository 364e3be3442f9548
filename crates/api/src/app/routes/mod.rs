use axum::Router;

pub mod catalog;
pub mod costing;
pub mod orders;
pub mod partners;
pub mod system;

/// Router for every domain endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/partners", partners::router())
        .nest("/orders", orders::router())
        .nest("/catalog", catalog::router())
        .nest("/costing", costing::router())
}
