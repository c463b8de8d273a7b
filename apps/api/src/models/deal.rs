use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DealFlowEntry {
    pub id: Uuid,
    pub investor_id: Uuid,
    pub founder_id: Option<Uuid>,
    pub startup_name: String,
    pub status: String,
    pub notes: Option<String>,
    pub investment_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealStatus {
    New,
    Reviewing,
    DueDiligence,
    TermSheet,
    Invested,
    Passed,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::New => "new",
            DealStatus::Reviewing => "reviewing",
            DealStatus::DueDiligence => "due_diligence",
            DealStatus::TermSheet => "term_sheet",
            DealStatus::Invested => "invested",
            DealStatus::Passed => "passed",
        }
    }
}

impl FromStr for DealStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(DealStatus::New),
            "reviewing" => Ok(DealStatus::Reviewing),
            "due_diligence" => Ok(DealStatus::DueDiligence),
            "term_sheet" => Ok(DealStatus::TermSheet),
            "invested" => Ok(DealStatus::Invested),
            "passed" => Ok(DealStatus::Passed),
            _ => Err(AppError::validation(format!("Invalid deal status: {s}"))),
        }
    }
}
