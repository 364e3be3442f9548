//! Catalog storage backends beyond the in-memory one shipped with the
//! catalog crate.

pub mod postgres;

pub use postgres::PostgresCatalogStore;
