//! Job seeker discovery and profiles.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extract::{Json, Query};
use crate::models::profile::JobseekerProfile;
use crate::models::user::UserRole;
use crate::profiles::queries::{add_active_role, require_user_by_civic_id};
use crate::profiles::require_civic_id;
use crate::query::params::non_empty;
use crate::query::{select, split_list, Filter, Pagination, Predicate};
use crate::state::AppState;

const JOBSEEKER_SELECT: &str = r#"
    SELECT js.*, u.civic_id, u.name, u.email
    FROM jobseeker_profiles js
    JOIN users u ON u.id = js.user_id"#;

#[derive(Debug, Default, Deserialize)]
pub struct JobseekerQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    /// Comma-separated; matches profiles listing any of them.
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertJobseekerRequest {
    pub civic_id: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub desired_roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobseekersResponse {
    pub jobseekers: Vec<JobseekerProfile>,
}

#[derive(Debug, Serialize)]
pub struct JobseekerResponse {
    pub jobseeker: JobseekerProfile,
}

/// GET /api/jobseeker?skills=&experience=&location=&limit=&offset=
pub async fn handle_list_jobseekers(
    State(state): State<AppState>,
    Query(params): Query<JobseekerQuery>,
) -> Result<Json<JobseekersResponse>, AppError> {
    let page = Pagination::parse(params.limit.as_deref(), params.offset.as_deref())?;
    let filter = jobseeker_filter(&params);

    let mut query = select(JOBSEEKER_SELECT, filter, "js.created_at DESC, js.id", page);
    let jobseekers = query
        .build_query_as::<JobseekerProfile>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(JobseekersResponse { jobseekers }))
}

/// POST /api/jobseeker
pub async fn handle_upsert_jobseeker(
    State(state): State<AppState>,
    Json(req): Json<UpsertJobseekerRequest>,
) -> Result<Json<JobseekerResponse>, AppError> {
    let civic_id = require_civic_id(req.civic_id.as_deref())?;
    let skills = normalize_list(&req.skills);
    if skills.is_empty() {
        return Err(AppError::validation("At least one skill is required"));
    }
    let desired_roles = normalize_list(&req.desired_roles);

    let user = require_user_by_civic_id(&state.db, &civic_id).await?;

    let mut tx = state.db.begin().await?;
    let jobseeker = sqlx::query_as::<_, JobseekerProfile>(
        r#"
        WITH upserted AS (
            INSERT INTO jobseeker_profiles
                (user_id, skills, experience_level, location, desired_roles)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                skills = EXCLUDED.skills,
                experience_level = EXCLUDED.experience_level,
                location = EXCLUDED.location,
                desired_roles = EXCLUDED.desired_roles,
                updated_at = now()
            RETURNING *
        )
        SELECT upserted.*, u.civic_id, u.name, u.email
        FROM upserted JOIN users u ON u.id = upserted.user_id
        "#,
    )
    .bind(user.id)
    .bind(&skills)
    .bind(&req.experience_level)
    .bind(&req.location)
    .bind(&desired_roles)
    .fetch_one(&mut *tx)
    .await?;
    add_active_role(&mut *tx, user.id, UserRole::Employee).await?;
    tx.commit().await?;

    info!("Saved job seeker profile for user {}", user.id);
    Ok(Json(JobseekerResponse { jobseeker }))
}

fn jobseeker_filter(params: &JobseekerQuery) -> Filter {
    let mut filter = Filter::new();
    if let Some(skills) = params.skills.as_deref() {
        let skills = split_list(skills);
        if !skills.is_empty() {
            filter.and(Predicate::Overlaps("js.skills", skills));
        }
    }
    if let Some(experience) = non_empty(params.experience.as_deref()) {
        filter.and(Predicate::eq("js.experience_level", experience));
    }
    if let Some(location) = non_empty(params.location.as_deref()) {
        filter.and(Predicate::ilike_contains("js.location", location));
    }
    filter
}

fn normalize_list(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[test]
    fn test_filter_composition() {
        let params = JobseekerQuery {
            skills: Some("rust, postgres".to_string()),
            experience: Some("senior".to_string()),
            location: Some("Berlin".to_string()),
            ..Default::default()
        };
        let mut expected = Filter::new();
        expected
            .and(Predicate::Overlaps(
                "js.skills",
                vec!["rust".to_string(), "postgres".to_string()],
            ))
            .and(Predicate::eq("js.experience_level", "senior"))
            .and(Predicate::ILike("js.location", "%Berlin%".to_string()));
        assert_eq!(jobseeker_filter(&params), expected);
    }

    #[test]
    fn test_blank_skills_are_ignored() {
        let params = JobseekerQuery {
            skills: Some(" , ".to_string()),
            ..Default::default()
        };
        assert!(jobseeker_filter(&params).is_empty());
    }

    #[test]
    fn test_normalize_list_dedups_case_insensitively() {
        let items = vec!["Rust".to_string(), " rust ".to_string(), "".to_string(), "Go".to_string()];
        assert_eq!(normalize_list(&items), vec!["Rust", "Go"]);
    }

    #[tokio::test]
    async fn test_upsert_requires_skills() {
        let (state, _) = test_state();
        let result = handle_upsert_jobseeker(
            State(state),
            Json(UpsertJobseekerRequest {
                civic_id: Some("abc".to_string()),
                ..Default::default()
            }),
        )
        .await;
        match result {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "At least one skill is required"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
