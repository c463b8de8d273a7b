use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub civic_id: String,
    pub role: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub active_roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Founder,
    Investor,
    Employee,
    Mentor,
    Other,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Founder => "founder",
            UserRole::Investor => "investor",
            UserRole::Employee => "employee",
            UserRole::Mentor => "mentor",
            UserRole::Other => "other",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "founder" => Ok(UserRole::Founder),
            "investor" => Ok(UserRole::Investor),
            "employee" => Ok(UserRole::Employee),
            "mentor" => Ok(UserRole::Mentor),
            "other" => Ok(UserRole::Other),
            _ => Err(AppError::validation(format!("Invalid role: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("Investor".parse::<UserRole>().unwrap(), UserRole::Investor);
        assert_eq!(" mentor ".parse::<UserRole>().unwrap(), UserRole::Mentor);
    }

    #[test]
    fn test_unknown_role_is_validation_error() {
        match "wizard".parse::<UserRole>() {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Invalid role: wizard"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Founder).unwrap(),
            "\"founder\""
        );
    }
}
