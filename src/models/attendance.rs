//! Attendance model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CourseDeskError, Result};

/// Stored attendance vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    MakeupPlanned,
    MakeupDone,
}

/// External vocabulary accepted from callers and the stored value it maps to.
/// `sick` is recorded as `absent`.
const EXTERNAL_VOCABULARY: &[(&str, AttendanceStatus)] = &[
    ("present", AttendanceStatus::Present),
    ("absent", AttendanceStatus::Absent),
    ("sick", AttendanceStatus::Absent),
    ("makeup_planned", AttendanceStatus::MakeupPlanned),
    ("makeup_done", AttendanceStatus::MakeupDone),
];

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::MakeupPlanned => "makeup_planned",
            AttendanceStatus::MakeupDone => "makeup_done",
        }
    }

    /// Map a caller-supplied status onto the stored vocabulary
    pub fn normalize(raw: &str) -> Result<Self> {
        let key = raw.trim().to_ascii_lowercase();
        EXTERNAL_VOCABULARY
            .iter()
            .find(|(external, _)| *external == key)
            .map(|(_, status)| *status)
            .ok_or_else(|| CourseDeskError::Validation(format!("Unknown attendance status: {}", raw)))
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = CourseDeskError;

    /// Parses the stored vocabulary only
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "makeup_planned" => Ok(AttendanceStatus::MakeupPlanned),
            "makeup_done" => Ok(AttendanceStatus::MakeupDone),
            other => Err(CourseDeskError::Validation(format!("Unknown stored attendance status: {}", other))),
        }
    }
}

/// Raw `attendance` row
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub lesson_id: i64,
    pub student_id: i64,
    pub status: String,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub lesson_id: i64,
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = CourseDeskError;

    fn try_from(row: AttendanceRow) -> Result<Self> {
        Ok(Self {
            lesson_id: row.lesson_id,
            student_id: row.student_id,
            status: row.status.parse()?,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

/// Result of an upsert: the row as written and the status it replaced, if any
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceWrite {
    pub attendance: Attendance,
    pub previous: Option<AttendanceStatus>,
}
