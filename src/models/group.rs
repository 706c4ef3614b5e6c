//! Group model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CourseDeskError, Result};

/// Weekly-recurring teaching slot
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub teacher_id: i64,
    /// ISO weekday, 1 = Monday .. 7 = Sunday
    pub weekly_day: i16,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Active,
    Inactive,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Active => "active",
            GroupStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for GroupStatus {
    type Err = CourseDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(GroupStatus::Active),
            "inactive" => Ok(GroupStatus::Inactive),
            other => Err(CourseDeskError::Validation(format!("Unknown group status: {}", other))),
        }
    }
}

impl Group {
    /// Eligible for bulk generation
    pub fn is_schedulable(&self) -> bool {
        !self.is_deleted && self.status == GroupStatus::Active.as_str()
    }
}

/// Fields needed to create a group (administrative CRUD lives outside the core;
/// this is used by fixtures and the in-memory store)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub teacher_id: i64,
    pub weekly_day: i16,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: GroupStatus,
}
