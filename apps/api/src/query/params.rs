use sqlx::{Postgres, QueryBuilder};

use crate::errors::AppError;

/// `limit` / `offset` pagination, always applied as `LIMIT $n OFFSET $m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 10;

    /// Parses raw query-string values. Absent or empty values fall back to the
    /// defaults; anything else must be an integer in range.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Result<Self, AppError> {
        let limit = match non_empty(limit) {
            None => Self::DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n > 0 => n,
                _ => return Err(AppError::validation("limit must be a positive integer")),
            },
        };
        let offset = match non_empty(offset) {
            None => 0,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 0 => n,
                _ => {
                    return Err(AppError::validation(
                        "offset must be a non-negative integer",
                    ))
                }
            },
        };
        Ok(Self { limit, offset })
    }

    pub fn push_into(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ")
            .push_bind(self.limit)
            .push(" OFFSET ")
            .push_bind(self.offset);
    }
}

/// Parses an optional integer parameter, naming it in the error.
pub fn parse_i64_param(name: &str, raw: Option<&str>) -> Result<Option<i64>, AppError> {
    non_empty(raw)
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AppError::validation(format!("{name} must be an integer")))
        })
        .transpose()
}

/// Splits a comma-separated parameter, trimming items and dropping empties.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Treats an empty or whitespace-only value as absent.
pub fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}
