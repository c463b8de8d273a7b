//! Users and their base profiles: first sign-in sync, lookup, update,
//! role listing and free-text search.

pub mod handlers;
pub mod queries;

use crate::errors::AppError;
use crate::query::params::non_empty;

/// Returns the trimmed civic id, or a 400 naming the missing field.
pub fn require_civic_id(raw: Option<&str>) -> Result<String, AppError> {
    non_empty(raw)
        .map(String::from)
        .ok_or_else(|| AppError::validation("Missing civicId"))
}
