//! Lesson change log model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Append-only audit row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChangeLogEntry {
    pub id: i64,
    pub lesson_id: i64,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: i64,
    pub changed_by_name: String,
    pub changed_by_external_id: Option<String>,
    pub changed_via: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChangeLogEntry {
    pub lesson_id: i64,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: i64,
    pub changed_by_name: String,
    pub changed_by_external_id: Option<String>,
    pub changed_via: String,
}

/// Field name under which attendance changes of a student are logged
pub fn attendance_field(student_id: i64) -> String {
    format!("attendance:{}", student_id)
}

/// Who and through which channel; stamped onto every entry of one mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    pub changed_by: i64,
    pub changed_by_name: String,
    pub changed_by_external_id: Option<String>,
    pub changed_via: String,
}

impl AuditStamp {
    pub fn entry(
        &self,
        lesson_id: i64,
        field_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> NewChangeLogEntry {
        NewChangeLogEntry {
            lesson_id,
            field_name: field_name.into(),
            old_value,
            new_value,
            changed_by: self.changed_by,
            changed_by_name: self.changed_by_name.clone(),
            changed_by_external_id: self.changed_by_external_id.clone(),
            changed_via: self.changed_via.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_carries_actor_onto_entries() {
        let stamp = AuditStamp {
            changed_by: -1,
            changed_by_name: "Anna".to_string(),
            changed_by_external_id: Some("777".to_string()),
            changed_via: "telegram".to_string(),
        };
        let entry = stamp.entry(4, attendance_field(9), Some("present".to_string()), Some("absent".to_string()));
        assert_eq!(entry.field_name, "attendance:9");
        assert_eq!(entry.lesson_id, 4);
        assert_eq!(entry.changed_by_external_id.as_deref(), Some("777"));
        assert_eq!(entry.changed_via, "telegram");
    }
}
