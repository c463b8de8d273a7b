//! Role-specific profile rows. Each is a one-to-one extension of a `User`,
//! returned joined with the owner's name, email and civic id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvestorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub firm_name: Option<String>,
    pub preferred_industries: Vec<String>,
    pub preferred_stages: Vec<String>,
    pub min_investment: Option<i64>,
    pub max_investment: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub civic_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobseekerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
    pub location: Option<String>,
    pub desired_roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub civic_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FounderProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: String,
    pub industry: Option<String>,
    pub stage: Option<String>,
    pub location: Option<String>,
    pub funding_goal: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub civic_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}
