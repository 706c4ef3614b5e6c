//! Attendance repository implementation

use sqlx::{FromRow, PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::attendance::{Attendance, AttendanceRow, AttendanceStatus, AttendanceWrite};
use crate::utils::errors::Result;

#[derive(Debug, Clone, FromRow)]
struct UpsertRow {
    lesson_id: i64,
    student_id: i64,
    status: String,
    updated_by: Option<i64>,
    updated_at: DateTime<Utc>,
    previous_status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Single-statement insert-or-update; also reports the status it replaced
    pub async fn upsert(
        conn: &mut PgConnection,
        lesson_id: i64,
        student_id: i64,
        status: AttendanceStatus,
        updated_by: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceWrite> {
        let row = sqlx::query_as::<_, UpsertRow>(
            r#"
            WITH previous AS (
                SELECT status FROM attendance WHERE lesson_id = $1 AND student_id = $2
            )
            INSERT INTO attendance (lesson_id, student_id, status, updated_by, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (lesson_id, student_id)
            DO UPDATE SET status = EXCLUDED.status,
                          updated_by = EXCLUDED.updated_by,
                          updated_at = EXCLUDED.updated_at
            RETURNING lesson_id, student_id, status, updated_by, updated_at,
                      (SELECT status FROM previous) AS previous_status
            "#
        )
        .bind(lesson_id)
        .bind(student_id)
        .bind(status.as_str())
        .bind(updated_by)
        .bind(now)
        .fetch_one(conn)
        .await?;

        let previous = row.previous_status.as_deref().map(str::parse::<AttendanceStatus>).transpose()?;
        let attendance = Attendance::try_from(AttendanceRow {
            lesson_id: row.lesson_id,
            student_id: row.student_id,
            status: row.status,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })?;

        Ok(AttendanceWrite { attendance, previous })
    }

    /// Attendance rows for a lesson
    pub async fn list_for_lesson(&self, lesson_id: i64) -> Result<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT lesson_id, student_id, status, updated_by, updated_at FROM attendance WHERE lesson_id = $1 ORDER BY student_id ASC"
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Attendance::try_from).collect()
    }
}
