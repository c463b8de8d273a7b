use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::extract::{Json, Query};
use crate::query::params::non_empty;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResearchQuery {
    pub q: Option<String>,
}

/// GET /api/research?q=
pub async fn handle_research(
    State(state): State<AppState>,
    Query(params): Query<ResearchQuery>,
) -> Result<Json<Value>, AppError> {
    let query = non_empty(params.q.as_deref())
        .ok_or_else(|| AppError::validation("Search query parameter \"q\" is required"))?;

    let body = state.research.search(query).await?;
    Ok(Json(body))
}
