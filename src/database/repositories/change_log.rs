//! Lesson change log repository (append-only)

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::change_log::{ChangeLogEntry, NewChangeLogEntry};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct ChangeLogRepository {
    pool: PgPool,
}

impl ChangeLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, entry: NewChangeLogEntry, now: DateTime<Utc>) -> Result<ChangeLogEntry> {
        let mut conn = self.pool.acquire().await?;
        Self::append_on(&mut conn, entry, now).await
    }

    /// Append on a caller-owned connection (inside a lesson or attendance transaction)
    pub async fn append_on(conn: &mut PgConnection, entry: NewChangeLogEntry, now: DateTime<Utc>) -> Result<ChangeLogEntry> {
        let row = sqlx::query_as::<_, ChangeLogEntry>(
            r#"
            INSERT INTO lesson_change_logs (lesson_id, field_name, old_value, new_value, changed_by, changed_by_name, changed_by_external_id, changed_via, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, lesson_id, field_name, old_value, new_value, changed_by, changed_by_name, changed_by_external_id, changed_via, created_at
            "#
        )
        .bind(entry.lesson_id)
        .bind(entry.field_name)
        .bind(entry.old_value)
        .bind(entry.new_value)
        .bind(entry.changed_by)
        .bind(entry.changed_by_name)
        .bind(entry.changed_by_external_id)
        .bind(entry.changed_via)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(row)
    }

    pub async fn list_for_lesson(&self, lesson_id: i64) -> Result<Vec<ChangeLogEntry>> {
        let rows = sqlx::query_as::<_, ChangeLogEntry>(
            "SELECT id, lesson_id, field_name, old_value, new_value, changed_by, changed_by_name, changed_by_external_id, changed_via, created_at FROM lesson_change_logs WHERE lesson_id = $1 ORDER BY id ASC"
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
