//! Axum route handlers for users and profiles.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{Json, Path, Query};
use crate::models::user::{User, UserRole};
use crate::profiles::queries::{find_user_by_civic_id, find_user_by_id};
use crate::profiles::require_civic_id;
use crate::query::params::non_empty;
use crate::query::{count, select, Filter, Pagination, Predicate};
use crate::state::AppState;

const USER_ORDER: &str = "created_at DESC, id";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUserRequest {
    pub civic_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub civic_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    pub active_roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ByRoleQuery {
    pub role: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UsersByRoleResponse {
    pub users: Vec<User>,
    pub role: UserRole,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub users: Vec<User>,
    pub query: String,
    pub role: Option<UserRole>,
    pub total: i64,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/users
///
/// Creates the user on first sign-in. Repeated calls with the same civic id
/// return the existing row unchanged.
pub async fn handle_sync_user(
    State(state): State<AppState>,
    Json(req): Json<SyncUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let role = parse_optional_role(req.role.as_deref())?.unwrap_or(UserRole::Other);

    let created = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (civic_id, email, name, role, active_roles)
        VALUES ($1, $2, $3, $4, ARRAY[$4::text])
        ON CONFLICT (civic_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&civic_id)
    .bind(&req.email)
    .bind(&req.name)
    .bind(role.as_str())
    .fetch_optional(&state.db)
    .await?;

    let user = match created {
        Some(user) => {
            info!("Created user {} for civic id {civic_id}", user.id);
            user
        }
        None => find_user_by_civic_id(&state.db, &civic_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?,
    };

    Ok(Json(UserResponse { user }))
}

/// GET /api/profiles/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = parse_user_id(&user_id)?;

    let user = find_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserResponse { user }))
}

/// PUT /api/profiles/:user_id
///
/// Only the owner (matched by civic id) may update a profile. Absent fields
/// are left unchanged. A new primary role is also added to the active roles.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let role = parse_optional_role(req.role.as_deref())?;
    let active_roles = req
        .active_roles
        .as_deref()
        .map(parse_role_list)
        .transpose()?;

    let existing = find_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if existing.civic_id != civic_id {
        return Err(AppError::forbidden("Not authorized to update this profile"));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            bio = COALESCE($4, bio),
            role = COALESCE($5, role),
            active_roles = CASE
                WHEN $5::text IS NULL OR $5::text = ANY(COALESCE($6, active_roles))
                    THEN COALESCE($6, active_roles)
                ELSE array_append(COALESCE($6, active_roles), $5::text)
            END,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.email)
    .bind(&req.bio)
    .bind(role.map(|r| r.as_str()))
    .bind(active_roles)
    .fetch_one(&state.db)
    .await?;

    info!("Updated profile for user {user_id}");
    Ok(Json(UserResponse { user }))
}

/// GET /api/profiles/by-role?role=&limit=&offset=
pub async fn handle_by_role(
    State(state): State<AppState>,
    Query(params): Query<ByRoleQuery>,
) -> Result<Json<UsersByRoleResponse>, AppError> {
    let role = non_empty(params.role.as_deref())
        .ok_or_else(|| AppError::validation("Role parameter is required"))?
        .parse::<UserRole>()?;
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;

    let filter = role_filter(role);
    let (users, total) = fetch_users_page(&state, filter, page).await?;

    Ok(Json(UsersByRoleResponse { users, role, total }))
}

/// GET /api/profiles/search?q=&role=&limit=&offset=
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = non_empty(params.q.as_deref())
        .ok_or_else(|| AppError::validation("Search query parameter \"q\" is required"))?
        .to_string();
    let role = parse_optional_role(params.role.as_deref())?;
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;

    let filter = search_filter(&query, role);
    let (users, total) = fetch_users_page(&state, filter, page).await?;

    Ok(Json(SearchResponse {
        users,
        query,
        role,
        total,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn fetch_users_page(
    state: &AppState,
    filter: Filter,
    page: Pagination,
) -> Result<(Vec<User>, i64), AppError> {
    let mut total_query = count("users", filter.clone());
    let total: i64 = total_query
        .build_query_scalar()
        .fetch_one(&state.db)
        .await?;

    let mut users_query = select("SELECT * FROM users", filter, USER_ORDER, page);
    let users = users_query
        .build_query_as::<User>()
        .fetch_all(&state.db)
        .await?;

    Ok((users, total))
}

fn role_filter(role: UserRole) -> Filter {
    let mut filter = Filter::new();
    filter.and(Predicate::Any(vec![
        Predicate::eq("role", role.as_str()),
        Predicate::contains("active_roles", role.as_str()),
    ]));
    filter
}

fn search_filter(query: &str, role: Option<UserRole>) -> Filter {
    let mut filter = Filter::new();
    filter.and(Predicate::Any(vec![
        Predicate::ilike_contains("name", query),
        Predicate::ilike_contains("email", query),
        Predicate::ilike_contains("bio", query),
    ]));
    if let Some(role) = role {
        filter.and(Predicate::eq("role", role.as_str()));
    }
    filter
}

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation("User ID is required"));
    }
    Uuid::parse_str(raw).map_err(|_| AppError::validation("Invalid user ID"))
}

fn parse_optional_role(raw: Option<&str>) -> Result<Option<UserRole>, AppError> {
    non_empty(raw).map(str::parse::<UserRole>).transpose()
}

fn parse_role_list(raw: &[String]) -> Result<Vec<String>, AppError> {
    let mut roles = Vec::with_capacity(raw.len());
    for role in raw {
        let role = role.parse::<UserRole>()?.as_str().to_string();
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    use crate::test_support::{db_state, seed_user, test_state};

    #[test]
    fn test_parse_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(&id.to_string()).unwrap(), id);
        match parse_user_id("  ") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "User ID is required"),
            other => panic!("unexpected: {other:?}"),
        }
        match parse_user_id("not-a-uuid") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Invalid user ID"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_search_filter_is_or_over_text_columns() {
        let filter = search_filter("ada", Some(UserRole::Investor));
        let mut expected = Filter::new();
        expected
            .and(Predicate::Any(vec![
                Predicate::ILike("name", "%ada%".to_string()),
                Predicate::ILike("email", "%ada%".to_string()),
                Predicate::ILike("bio", "%ada%".to_string()),
            ]))
            .and(Predicate::eq("role", "investor"));
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_role_filter_matches_primary_or_active_role() {
        let mut expected = Filter::new();
        expected.and(Predicate::Any(vec![
            Predicate::eq("role", "mentor"),
            Predicate::contains("active_roles", "mentor"),
        ]));
        assert_eq!(role_filter(UserRole::Mentor), expected);
    }

    #[test]
    fn test_role_list_dedups_and_normalizes() {
        let roles = parse_role_list(&["Founder".to_string(), "founder".to_string()]).unwrap();
        assert_eq!(roles, vec!["founder"]);
        assert!(parse_role_list(&["pirate".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_search_without_q_is_rejected() {
        let (state, _) = test_state();
        let result = handle_search(
            State(state),
            Query(SearchQuery {
                q: None,
                role: None,
                limit: None,
                offset: None,
            }),
        )
        .await;
        match result {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Search query parameter \"q\" is required")
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_by_role_requires_valid_role() {
        let (state, _) = test_state();
        let missing = handle_by_role(
            State(state.clone()),
            Query(ByRoleQuery {
                role: None,
                limit: None,
                offset: None,
            }),
        )
        .await;
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let invalid = handle_by_role(
            State(state),
            Query(ByRoleQuery {
                role: Some("astronaut".to_string()),
                limit: None,
                offset: None,
            }),
        )
        .await;
        assert!(matches!(invalid, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_without_civic_id_is_rejected() {
        let (state, _) = test_state();
        let result = handle_update_profile(
            State(state),
            Path(Uuid::new_v4().to_string()),
            Json(UpdateProfileRequest::default()),
        )
        .await;
        match result {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Missing civicId"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    async fn by_role_page(state: &AppState, role: &str, limit: u32, offset: u32) -> UsersByRoleResponse {
        let Json(page) = handle_by_role(
            State(state.clone()),
            Query(ByRoleQuery {
                role: Some(role.to_string()),
                limit: Some(limit.to_string()),
                offset: Some(offset.to_string()),
            }),
        )
        .await
        .unwrap();
        page
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unknown_user_is_404(pool: PgPool) {
        let state = db_state(pool);
        match handle_get_profile(State(state), Path(Uuid::new_v4().to_string())).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_sync_user_is_idempotent(pool: PgPool) {
        let state = db_state(pool);
        let request = || SyncUserRequest {
            civic_id: Some("civic-sync".to_string()),
            email: Some("sync@example.com".to_string()),
            name: Some("Sync".to_string()),
            role: Some("founder".to_string()),
        };

        let Json(first) = handle_sync_user(State(state.clone()), Json(request())).await.unwrap();
        let Json(second) = handle_sync_user(State(state), Json(request())).await.unwrap();
        assert_eq!(first.user.id, second.user.id);
        assert_eq!(first.user.role, "founder");
        assert_eq!(first.user.active_roles, vec!["founder"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_by_role_pages_are_disjoint_and_total_counts_all(pool: PgPool) {
        for i in 0..5 {
            seed_user(&pool, &format!("investor-{i}"), "investor").await;
        }
        seed_user(&pool, "founder-0", "founder").await;
        let state = db_state(pool);

        let first = by_role_page(&state, "investor", 2, 0).await;
        let second = by_role_page(&state, "investor", 2, 2).await;
        let last = by_role_page(&state, "investor", 2, 4).await;

        assert_eq!(first.users.len(), 2);
        assert_eq!(second.users.len(), 2);
        assert_eq!(last.users.len(), 1);
        for page in [&first, &second, &last] {
            assert_eq!(page.total, 5);
            assert!(page.users.iter().all(|u| u.role == "investor"));
        }

        let mut ids: Vec<Uuid> = [&first, &second, &last]
            .iter()
            .flat_map(|p| p.users.iter().map(|u| u.id))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_search_total_ignores_paging(pool: PgPool) {
        seed_user(&pool, "ada-one", "founder").await;
        seed_user(&pool, "ada-two", "investor").await;
        seed_user(&pool, "grace", "founder").await;
        let state = db_state(pool);

        let Json(found) = handle_search(
            State(state),
            Query(SearchQuery {
                q: Some("ADA".to_string()),
                role: None,
                limit: Some("1".to_string()),
                offset: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.users.len(), 1);
        assert_eq!(found.total, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_by_other_civic_id_is_forbidden(pool: PgPool) {
        let owner = seed_user(&pool, "civic-owner", "founder").await;
        let state = db_state(pool);

        let result = handle_update_profile(
            State(state),
            Path(owner.id.to_string()),
            Json(UpdateProfileRequest {
                civic_id: Some("civic-intruder".to_string()),
                bio: Some("taken over".to_string()),
                ..Default::default()
            }),
        )
        .await;
        match result {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "Not authorized to update this profile"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_role_change_joins_active_roles(pool: PgPool) {
        let owner = seed_user(&pool, "civic-switch", "founder").await;
        let state = db_state(pool);

        let Json(updated) = handle_update_profile(
            State(state.clone()),
            Path(owner.id.to_string()),
            Json(UpdateProfileRequest {
                civic_id: Some("civic-switch".to_string()),
                role: Some("investor".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.user.role, "investor");
        assert_eq!(updated.user.active_roles, vec!["founder", "investor"]);

        // Re-applying the same role does not duplicate it.
        let Json(again) = handle_update_profile(
            State(state),
            Path(owner.id.to_string()),
            Json(UpdateProfileRequest {
                civic_id: Some("civic-switch".to_string()),
                role: Some("investor".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(again.user.active_roles, vec!["founder", "investor"]);
    }
}
