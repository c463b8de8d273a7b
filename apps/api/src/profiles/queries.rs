use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{User, UserRole};

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_civic_id(
    pool: &PgPool,
    civic_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE civic_id = $1")
        .bind(civic_id)
        .fetch_optional(pool)
        .await
}

/// Resolves the requesting identity to a user, 404 if none exists yet.
pub async fn require_user_by_civic_id(pool: &PgPool, civic_id: &str) -> Result<User, AppError> {
    find_user_by_civic_id(pool, civic_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Adds `role` to the user's active roles if it is not already present.
pub async fn add_active_role(
    conn: &mut PgConnection,
    user_id: Uuid,
    role: UserRole,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET active_roles = array_append(active_roles, $2), updated_at = now()
        WHERE id = $1 AND NOT ($2 = ANY(active_roles))
        "#,
    )
    .bind(user_id)
    .bind(role.as_str())
    .execute(conn)
    .await?;
    Ok(())
}
