//! Lesson model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use crate::models::actor::Channel;
use crate::utils::errors::{CourseDeskError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Scheduled,
    Done,
    Canceled,
}

impl LessonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Scheduled => "scheduled",
            LessonStatus::Done => "done",
            LessonStatus::Canceled => "canceled",
        }
    }

    /// Status changes allowed by the lifecycle. `done -> done` is the re-entrant
    /// self-transition used for content edits on completed lessons.
    pub fn can_transition_to(&self, next: LessonStatus) -> bool {
        matches!(
            (self, next),
            (LessonStatus::Scheduled, LessonStatus::Done)
                | (LessonStatus::Scheduled, LessonStatus::Canceled)
                | (LessonStatus::Done, LessonStatus::Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LessonStatus::Canceled)
    }
}

impl std::fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LessonStatus {
    type Err = CourseDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scheduled" => Ok(LessonStatus::Scheduled),
            "done" => Ok(LessonStatus::Done),
            "canceled" => Ok(LessonStatus::Canceled),
            other => Err(CourseDeskError::Validation(format!("Unknown lesson status: {}", other))),
        }
    }
}

/// Raw `lessons` row
#[derive(Debug, Clone, FromRow)]
pub struct LessonRow {
    pub id: i64,
    pub public_id: Uuid,
    pub group_id: i64,
    pub lesson_date: NaiveDate,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub status: String,
    pub topic: Option<String>,
    pub notes: Option<String>,
    pub topic_set_by: Option<i64>,
    pub topic_set_at: Option<DateTime<Utc>>,
    pub notes_set_by: Option<i64>,
    pub notes_set_at: Option<DateTime<Utc>>,
    pub reported_by: Option<i64>,
    pub reported_at: Option<DateTime<Utc>>,
    pub reported_via: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One calendar occurrence of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub public_id: Uuid,
    pub group_id: i64,
    pub lesson_date: NaiveDate,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub status: LessonStatus,
    pub topic: Option<String>,
    pub notes: Option<String>,
    pub topic_set_by: Option<i64>,
    pub topic_set_at: Option<DateTime<Utc>>,
    pub notes_set_by: Option<i64>,
    pub notes_set_at: Option<DateTime<Utc>>,
    pub reported_by: Option<i64>,
    pub reported_at: Option<DateTime<Utc>>,
    pub reported_via: Option<Channel>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LessonRow> for Lesson {
    type Error = CourseDeskError;

    fn try_from(row: LessonRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            public_id: row.public_id,
            group_id: row.group_id,
            lesson_date: row.lesson_date,
            start_datetime: row.start_datetime,
            end_datetime: row.end_datetime,
            status: row.status.parse()?,
            topic: row.topic,
            notes: row.notes,
            topic_set_by: row.topic_set_by,
            topic_set_at: row.topic_set_at,
            notes_set_by: row.notes_set_by,
            notes_set_at: row.notes_set_at,
            reported_by: row.reported_by,
            reported_at: row.reported_at,
            reported_via: row.reported_via.as_deref().map(str::parse::<Channel>).transpose()?,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Lesson to be inserted by generation or ad-hoc creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLesson {
    pub group_id: i64,
    pub lesson_date: NaiveDate,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub created_by: i64,
}

/// Set of optional field values applied to a lesson in one write.
///
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonPatch {
    pub status: Option<LessonStatus>,
    pub topic: Option<String>,
    pub topic_set_by: Option<i64>,
    pub topic_set_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub notes_set_by: Option<i64>,
    pub notes_set_at: Option<DateTime<Utc>>,
    pub reported_by: Option<i64>,
    pub reported_at: Option<DateTime<Utc>>,
    pub reported_via: Option<Channel>,
}

/// A field-level change to be written to the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field_name: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl LessonPatch {
    pub fn is_empty(&self) -> bool {
        *self == LessonPatch::default()
    }

    /// Audited fields (status, topic, notes) whose value differs from `current`
    pub fn changes_against(&self, current: &Lesson) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if let Some(status) = self.status {
            if status != current.status {
                changes.push(FieldChange {
                    field_name: "status",
                    old_value: Some(current.status.as_str().to_string()),
                    new_value: Some(status.as_str().to_string()),
                });
            }
        }
        if let Some(topic) = &self.topic {
            if current.topic.as_ref() != Some(topic) {
                changes.push(FieldChange {
                    field_name: "topic",
                    old_value: current.topic.clone(),
                    new_value: Some(topic.clone()),
                });
            }
        }
        if let Some(notes) = &self.notes {
            if current.notes.as_ref() != Some(notes) {
                changes.push(FieldChange {
                    field_name: "notes",
                    old_value: current.notes.clone(),
                    new_value: Some(notes.clone()),
                });
            }
        }

        changes
    }

    /// Apply to an in-memory lesson (memory store and tests)
    pub fn apply_to(&self, lesson: &mut Lesson, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            lesson.status = status;
        }
        if let Some(topic) = &self.topic {
            lesson.topic = Some(topic.clone());
        }
        if let Some(by) = self.topic_set_by {
            lesson.topic_set_by = Some(by);
        }
        if let Some(at) = self.topic_set_at {
            lesson.topic_set_at = Some(at);
        }
        if let Some(notes) = &self.notes {
            lesson.notes = Some(notes.clone());
        }
        if let Some(by) = self.notes_set_by {
            lesson.notes_set_by = Some(by);
        }
        if let Some(at) = self.notes_set_at {
            lesson.notes_set_at = Some(at);
        }
        if let Some(by) = self.reported_by {
            lesson.reported_by = Some(by);
        }
        if let Some(at) = self.reported_at {
            lesson.reported_at = Some(at);
        }
        if let Some(via) = self.reported_via {
            lesson.reported_via = Some(via);
        }
        lesson.updated_at = now;
    }
}
