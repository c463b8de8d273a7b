use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extract::{Json, Query};
use crate::models::profile::InvestorProfile;
use crate::models::user::UserRole;
use crate::profiles::queries::{add_active_role, require_user_by_civic_id};
use crate::profiles::require_civic_id;
use crate::query::params::non_empty;
use crate::query::{parse_i64_param, select, Filter, Pagination, Predicate};
use crate::state::AppState;

const INVESTOR_SELECT: &str = r#"
    SELECT ip.*, u.civic_id, u.name, u.email
    FROM investor_profiles ip
    JOIN users u ON u.id = ip.user_id"#;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub min_investment: Option<String>,
    pub max_investment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertInvestorRequest {
    pub civic_id: Option<String>,
    pub firm_name: Option<String>,
    #[serde(default)]
    pub preferred_industries: Vec<String>,
    #[serde(default)]
    pub preferred_stages: Vec<String>,
    pub min_investment: Option<i64>,
    pub max_investment: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InvestorsResponse {
    pub investors: Vec<InvestorProfile>,
}

#[derive(Debug, Serialize)]
pub struct InvestorResponse {
    pub investor: InvestorProfile,
}

/// GET /api/investor?industry=&stage=&minInvestment=&maxInvestment=&limit=&offset=
pub async fn handle_list_investors(
    State(state): State<AppState>,
    Query(params): Query<InvestorQuery>,
) -> Result<Json<InvestorsResponse>, AppError> {
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;
    let filter = investor_filter(&params)?;

    let mut query = select(INVESTOR_SELECT, filter, "ip.created_at DESC, ip.id", page);
    let investors = query
        .build_query_as::<InvestorProfile>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(InvestorsResponse { investors }))
}

/// POST /api/investor
///
/// Creates or replaces the caller's investor profile and marks the investor
/// role active, atomically.
pub async fn handle_upsert_investor(
    State(state): State<AppState>,
    Json(req): Json<UpsertInvestorRequest>,
) -> Result<Json<InvestorResponse>, AppError> {
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    validate_investment_range(req.min_investment, req.max_investment)?;

    let user = require_user_by_civic_id(&state.db, &civic_id).await?;

    let mut tx = state.db.begin().await?;
    let investor = sqlx::query_as::<_, InvestorProfile>(
        r#"
        WITH upserted AS (
            INSERT INTO investor_profiles
                (user_id, firm_name, preferred_industries, preferred_stages,
                 min_investment, max_investment)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                firm_name = EXCLUDED.firm_name,
                preferred_industries = EXCLUDED.preferred_industries,
                preferred_stages = EXCLUDED.preferred_stages,
                min_investment = EXCLUDED.min_investment,
                max_investment = EXCLUDED.max_investment,
                updated_at = now()
            RETURNING *
        )
        SELECT upserted.*, u.civic_id, u.name, u.email
        FROM upserted JOIN users u ON u.id = upserted.user_id
        "#,
    )
    .bind(user.id)
    .bind(&req.firm_name)
    .bind(&req.preferred_industries)
    .bind(&req.preferred_stages)
    .bind(req.min_investment)
    .bind(req.max_investment)
    .fetch_one(&mut *tx)
    .await?;
    add_active_role(&mut *tx, user.id, UserRole::Investor).await?;
    tx.commit().await?;

    info!("Saved investor profile for user {}", user.id);
    Ok(Json(InvestorResponse { investor }))
}

/// Inclusive bounds: a profile matches when its whole stated range fits
/// inside `[minInvestment, maxInvestment]`.
fn investor_filter(params: &InvestorQuery) -> Result<Filter, AppError> {
    let min = parse_i64_param("minInvestment", params.min_investment.as_deref())?;
    let max = parse_i64_param("maxInvestment", params.max_investment.as_deref())?;

    let mut filter = Filter::new();
    if let Some(industry) = non_empty(params.industry.as_deref()) {
        filter.and(Predicate::contains("ip.preferred_industries", industry));
    }
    if let Some(stage) = non_empty(params.stage.as_deref()) {
        filter.and(Predicate::contains("ip.preferred_stages", stage));
    }
    if let Some(min) = min {
        filter.and(Predicate::Gte("ip.min_investment", min));
    }
    if let Some(max) = max {
        filter.and(Predicate::Lte("ip.max_investment", max));
    }
    Ok(filter)
}

fn validate_investment_range(min: Option<i64>, max: Option<i64>) -> Result<(), AppError> {
    if min.is_some_and(|m| m < 0) || max.is_some_and(|m| m < 0) {
        return Err(AppError::validation("Investment amounts must be non-negative"));
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(AppError::validation(
                "minInvestment cannot exceed maxInvestment",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    use crate::profiles::queries::find_user_by_id;
    use crate::test_support::{db_state, seed_investor_profile, seed_user, test_state};

    #[test]
    fn test_no_params_means_no_filter() {
        assert!(investor_filter(&InvestorQuery::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_investment_bounds_are_inclusive_range() {
        let params = InvestorQuery {
            industry: Some("fintech".to_string()),
            min_investment: Some("100000".to_string()),
            max_investment: Some("500000".to_string()),
            ..Default::default()
        };
        let mut expected = Filter::new();
        expected
            .and(Predicate::contains("ip.preferred_industries", "fintech"))
            .and(Predicate::Gte("ip.min_investment", 100_000))
            .and(Predicate::Lte("ip.max_investment", 500_000));
        assert_eq!(investor_filter(&params).unwrap(), expected);
    }

    #[test]
    fn test_non_numeric_bound_is_rejected() {
        let params = InvestorQuery {
            max_investment: Some("a lot".to_string()),
            ..Default::default()
        };
        match investor_filter(&params) {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "maxInvestment must be an integer"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_investment_range_validation() {
        assert!(validate_investment_range(Some(10), Some(20)).is_ok());
        assert!(validate_investment_range(None, Some(20)).is_ok());
        assert!(validate_investment_range(Some(30), Some(20)).is_err());
        assert!(validate_investment_range(Some(-1), None).is_err());
    }

    #[tokio::test]
    async fn test_upsert_requires_civic_id() {
        let (state, _) = test_state();
        let result = handle_upsert_investor(State(state), Json(UpsertInvestorRequest::default())).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_investment_bounds_include_exact_matches(pool: PgPool) {
        let exact = seed_user(&pool, "inv-exact", "investor").await;
        let below = seed_user(&pool, "inv-below", "investor").await;
        let above = seed_user(&pool, "inv-above", "investor").await;
        let other_industry = seed_user(&pool, "inv-health", "investor").await;
        seed_investor_profile(&pool, &exact, 100_000, 500_000, &["fintech", "ai"]).await;
        seed_investor_profile(&pool, &below, 50_000, 500_000, &["fintech"]).await;
        seed_investor_profile(&pool, &above, 100_000, 600_000, &["fintech"]).await;
        seed_investor_profile(&pool, &other_industry, 100_000, 500_000, &["health"]).await;
        let state = db_state(pool);

        let Json(found) = handle_list_investors(
            State(state),
            Query(InvestorQuery {
                industry: Some("fintech".to_string()),
                min_investment: Some("100000".to_string()),
                max_investment: Some("500000".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let ids: Vec<_> = found.investors.iter().map(|i| i.user_id).collect();
        assert_eq!(ids, vec![exact.id]);
        assert_eq!(found.investors[0].civic_id, "inv-exact");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_upsert_replaces_profile_and_activates_role(pool: PgPool) {
        let founder = seed_user(&pool, "civic-angel", "founder").await;
        let state = db_state(pool);
        let request = |firm: &str| UpsertInvestorRequest {
            civic_id: Some("civic-angel".to_string()),
            firm_name: Some(firm.to_string()),
            preferred_industries: vec!["climate".to_string()],
            min_investment: Some(25_000),
            max_investment: Some(250_000),
            ..Default::default()
        };

        let Json(first) = handle_upsert_investor(State(state.clone()), Json(request("Angel I")))
            .await
            .unwrap();
        let Json(second) = handle_upsert_investor(State(state.clone()), Json(request("Angel II")))
            .await
            .unwrap();
        assert_eq!(first.investor.id, second.investor.id);
        assert_eq!(second.investor.firm_name.as_deref(), Some("Angel II"));

        let user = find_user_by_id(&state.db, founder.id).await.unwrap().unwrap();
        assert_eq!(user.role, "founder");
        assert_eq!(user.active_roles, vec!["founder", "investor"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_upsert_for_unknown_civic_id_is_404(pool: PgPool) {
        let state = db_state(pool);
        let result = handle_upsert_investor(
            State(state),
            Json(UpsertInvestorRequest {
                civic_id: Some("nobody".to_string()),
                ..Default::default()
            }),
        )
        .await;
        match result {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
