use rust_decimal::Decimal;

use costbook_core::{DomainError, DomainResult};

pub(crate) fn positive(field: &str, value: Decimal) -> DomainResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} must be positive (got {value})")));
    }
    Ok(value)
}

pub(crate) fn non_negative(field: &str, value: Decimal) -> DomainResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::validation(format!("{field} must not be negative (got {value})")));
    }
    Ok(value)
}

/// Rejects values with more fractional digits than the column keeps and
/// values at or above `limit`. Trailing zeros do not count.
pub(crate) fn fits_numeric(field: &str, value: Decimal, scale: u32, limit: Decimal) -> DomainResult<Decimal> {
    let normalized = value.normalize();
    if normalized.scale() > scale {
        return Err(DomainError::validation(format!(
            "{field} allows at most {scale} decimal place(s) (got {value})"
        )));
    }
    if normalized >= limit {
        return Err(DomainError::validation(format!("{field} must be below {limit} (got {value})")));
    }
    Ok(value)
}

pub(crate) fn display_name(field: &str, value: String, max_chars: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}
