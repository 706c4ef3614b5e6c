//! Teacher, student and replacement models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub id: i64,
    pub full_name: String,
    pub telegram_id: Option<i64>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub is_deleted: bool,
}

/// Per-lesson teacher override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TeacherReplacement {
    pub lesson_id: i64,
    pub replacement_teacher_id: i64,
}
