//! Investor deal flow: the deals an investor is tracking and their status.
//!
//! Ownership is checked explicitly before any write. A caller whose civic id
//! does not match the deal's investor gets a 403, distinct from the 404 for a
//! deal that does not exist.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::deal::{DealFlowEntry, DealStatus};
use crate::models::user::{User, UserRole};
use crate::profiles::queries::require_user_by_civic_id;
use crate::profiles::require_civic_id;
use crate::query::params::non_empty;
use crate::query::{select, Filter, Pagination, Predicate};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealFlowQuery {
    pub civic_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    pub civic_id: Option<String>,
    pub startup_name: Option<String>,
    pub founder_id: Option<Uuid>,
    pub notes: Option<String>,
    pub investment_amount: Option<i64>,
}

/// Body keys follow the dashboard client: `civicId` alongside snake_case
/// deal fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDealRequest {
    #[serde(rename = "civicId")]
    pub civic_id: Option<String>,
    pub investment_amount: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DealsResponse {
    pub deals: Vec<DealFlowEntry>,
}

#[derive(Debug, Serialize)]
pub struct DealResponse {
    pub deal: DealFlowEntry,
}

/// GET /api/investor/deal-flow?civicId=&status=&limit=&offset=
pub async fn handle_list_deals(
    State(state): State<AppState>,
    Query(params): Query<DealFlowQuery>,
) -> Result<Json<DealsResponse>, AppError> {
    let civic_id = require_civic_id(params.civic_id.as_deref())?;
    let status = non_empty(params.status.as_deref())
        .map(str::parse::<DealStatus>)
        .transpose()?;
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;

    let investor = require_user_by_civic_id(&state.db, &civic_id).await?;

    let mut filter = Filter::new();
    filter.and(Predicate::eq("investor_id", investor.id));
    if let Some(status) = status {
        filter.and(Predicate::eq("status", status.as_str()));
    }

    let mut query = select(
        "SELECT * FROM deal_flow",
        filter,
        "created_at DESC, id",
        page,
    );
    let deals = query
        .build_query_as::<DealFlowEntry>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(DealsResponse { deals }))
}

/// POST /api/investor/deal-flow
pub async fn handle_create_deal(
    State(state): State<AppState>,
    Json(req): Json<CreateDealRequest>,
) -> Result<Json<DealResponse>, AppError> {
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let startup_name = non_empty(req.startup_name.as_deref())
        .ok_or_else(|| AppError::validation("Missing startupName"))?
        .to_string();
    validate_amount(req.investment_amount)?;

    let investor = require_user_by_civic_id(&state.db, &civic_id).await?;
    if !is_investor(&investor) {
        return Err(AppError::forbidden("Only investors can track deals"));
    }

    let deal = sqlx::query_as::<_, DealFlowEntry>(
        r#"
        INSERT INTO deal_flow (investor_id, founder_id, startup_name, status, notes, investment_amount)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(investor.id)
    .bind(req.founder_id)
    .bind(&startup_name)
    .bind(DealStatus::New.as_str())
    .bind(&req.notes)
    .bind(req.investment_amount)
    .fetch_one(&state.db)
    .await?;

    info!("Investor {} added deal {} ({startup_name})", investor.id, deal.id);
    Ok(Json(DealResponse { deal }))
}

/// PUT /api/investor/deal-flow/:deal_id
pub async fn handle_update_deal(
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
    Json(req): Json<UpdateDealRequest>,
) -> Result<Json<DealResponse>, AppError> {
    let deal_id =
        Uuid::parse_str(deal_id.trim()).map_err(|_| AppError::validation("Invalid deal ID"))?;
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let status = non_empty(req.status.as_deref())
        .map(str::parse::<DealStatus>)
        .transpose()?;
    validate_amount(req.investment_amount)?;

    let owner_civic_id: Option<String> = sqlx::query_scalar(
        r#"
        SELECT u.civic_id
        FROM deal_flow d
        JOIN users u ON u.id = d.investor_id
        WHERE d.id = $1
        "#,
    )
    .bind(deal_id)
    .fetch_optional(&state.db)
    .await?;
    let owner_civic_id = owner_civic_id.ok_or_else(|| AppError::not_found("Deal not found"))?;
    authorize_deal_update(&owner_civic_id, &civic_id)?;

    let deal = sqlx::query_as::<_, DealFlowEntry>(
        r#"
        UPDATE deal_flow
        SET investment_amount = COALESCE($2, investment_amount),
            notes = COALESCE($3, notes),
            status = COALESCE($4, status),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(deal_id)
    .bind(req.investment_amount)
    .bind(&req.notes)
    .bind(status.map(|s| s.as_str()))
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::not_found("Deal not found"))?;

    info!("Updated deal {deal_id} (status {})", deal.status);
    Ok(Json(DealResponse { deal }))
}

fn authorize_deal_update(owner_civic_id: &str, caller_civic_id: &str) -> Result<(), AppError> {
    if owner_civic_id == caller_civic_id {
        Ok(())
    } else {
        Err(AppError::forbidden("Not authorized to update this deal"))
    }
}

fn is_investor(user: &User) -> bool {
    let role = UserRole::Investor.as_str();
    user.role == role || user.active_roles.iter().any(|r| r == role)
}

fn validate_amount(amount: Option<i64>) -> Result<(), AppError> {
    match amount {
        Some(a) if a < 0 => Err(AppError::validation(
            "investment_amount must be non-negative",
        )),
        _ => Ok(()),
    }
}
