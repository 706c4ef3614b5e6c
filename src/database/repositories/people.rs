//! Teacher, student and replacement lookups

use sqlx::PgPool;
use crate::models::people::{Student, Teacher, TeacherReplacement};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct PeopleRepository {
    pool: PgPool,
}

impl PeopleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_teacher(&self, id: i64) -> Result<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "SELECT id, full_name, telegram_id, is_deleted FROM teachers WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(teacher)
    }

    pub async fn find_teacher_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "SELECT id, full_name, telegram_id, is_deleted FROM teachers WHERE telegram_id = $1 AND is_deleted = false"
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(teacher)
    }

    pub async fn find_student(&self, id: i64) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            "SELECT id, full_name, is_deleted FROM students WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    pub async fn find_replacement(&self, lesson_id: i64) -> Result<Option<TeacherReplacement>> {
        let replacement = sqlx::query_as::<_, TeacherReplacement>(
            "SELECT lesson_id, replacement_teacher_id FROM lesson_teacher_replacements WHERE lesson_id = $1"
        )
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(replacement)
    }
}
