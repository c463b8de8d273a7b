//! Founder discovery and profiles.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extract::{Json, Query};
use crate::models::profile::FounderProfile;
use crate::models::user::UserRole;
use crate::profiles::queries::{add_active_role, require_user_by_civic_id};
use crate::profiles::require_civic_id;
use crate::query::params::non_empty;
use crate::query::{select, Filter, Pagination, Predicate};
use crate::state::AppState;

const FOUNDER_SELECT: &str = r#"
    SELECT fp.*, u.civic_id, u.name, u.email
    FROM founder_profiles fp
    JOIN users u ON u.id = fp.user_id"#;

#[derive(Debug, Default, Deserialize)]
pub struct FounderQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertFounderRequest {
    pub civic_id: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub location: Option<String>,
    pub funding_goal: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FoundersResponse {
    pub founders: Vec<FounderProfile>,
}

#[derive(Debug, Serialize)]
pub struct FounderResponse {
    pub founder: FounderProfile,
}

/// GET /api/founder?industry=&stage=&location=&limit=&offset=
pub async fn handle_list_founders(
    State(state): State<AppState>,
    Query(params): Query<FounderQuery>,
) -> Result<Json<FoundersResponse>, AppError> {
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;
    let filter = founder_filter(&params);

    let mut query = select(FOUNDER_SELECT, filter, "fp.created_at DESC, fp.id", page);
    let founders = query
        .build_query_as::<FounderProfile>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(FoundersResponse { founders }))
}

/// POST /api/founder
pub async fn handle_upsert_founder(
    State(state): State<AppState>,
    Json(req): Json<UpsertFounderRequest>,
) -> Result<Json<FounderResponse>, AppError> {
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let company_name = non_empty(req.company_name.as_deref())
        .ok_or_else(|| AppError::validation("Missing companyName"))?
        .to_string();
    if req.funding_goal.is_some_and(|g| g < 0) {
        return Err(AppError::validation("fundingGoal must be non-negative"));
    }

    let user = require_user_by_civic_id(&state.db, &civic_id).await?;

    let mut tx = state.db.begin().await?;
    let founder = sqlx::query_as::<_, FounderProfile>(
        r#"
        WITH upserted AS (
            INSERT INTO founder_profiles
                (user_id, company_name, industry, stage, location, funding_goal)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                industry = EXCLUDED.industry,
                stage = EXCLUDED.stage,
                location = EXCLUDED.location,
                funding_goal = EXCLUDED.funding_goal,
                updated_at = now()
            RETURNING *
        )
        SELECT upserted.*, u.civic_id, u.name, u.email
        FROM upserted JOIN users u ON u.id = upserted.user_id
        "#,
    )
    .bind(user.id)
    .bind(&company_name)
    .bind(&req.industry)
    .bind(&req.stage)
    .bind(&req.location)
    .bind(req.funding_goal)
    .fetch_one(&mut *tx)
    .await?;
    add_active_role(&mut *tx, user.id, UserRole::Founder).await?;
    tx.commit().await?;

    info!("Saved founder profile for user {}", user.id);
    Ok(Json(FounderResponse { founder }))
}

fn founder_filter(params: &FounderQuery) -> Filter {
    let mut filter = Filter::new();
    if let Some(industry) = non_empty(params.industry.as_deref()) {
        filter.and(Predicate::eq("fp.industry", industry));
    }
    if let Some(stage) = non_empty(params.stage.as_deref()) {
        filter.and(Predicate::eq("fp.stage", stage));
    }
    if let Some(location) = non_empty(params.location.as_deref()) {
        filter.and(Predicate::ilike_contains("fp.location", location));
    }
    filter
}
