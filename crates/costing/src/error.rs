use serde::Serialize;
use thiserror::Error;

use costbook_catalog::{CatalogEntity, CatalogError};

pub type CostingResult<T> = Result<T, CostingError>;

/// Why a calculation could not produce a number.
///
/// All variants are deterministic for a given catalog state except `Store`,
/// which reports that the catalog backend could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostingError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: CatalogEntity, key: String },

    /// The service has no bill of materials; it is misconfigured, not free.
    #[error("service '{service_code}' has no consumption norms")]
    NoMaterials { service_code: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Link and catalog disagree (e.g. a consumption row names a missing material).
    #[error("catalog integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("catalog unavailable: {0}")]
    Store(String),
}

impl CostingError {
    pub(crate) fn not_found(entity: CatalogEntity, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<CatalogError> for CostingError {
    fn from(value: CatalogError) -> Self {
        CostingError::Store(value.to_string())
    }
}
