//! Lesson repository implementation

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use crate::models::lesson::{Lesson, LessonRow, LessonStatus, LessonPatch, NewLesson};
use crate::utils::errors::Result;

pub(crate) const LESSON_COLUMNS: &str = "id, public_id, group_id, lesson_date, start_datetime, end_datetime, status, topic, notes, topic_set_by, topic_set_at, notes_set_by, notes_set_at, reported_by, reported_at, reported_via, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct LessonRepository {
    pool: PgPool,
}

impl LessonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a scheduled lesson; `None` if `(group_id, lesson_date)` is taken
    pub async fn insert_if_absent(&self, lesson: NewLesson, now: DateTime<Utc>) -> Result<Option<Lesson>> {
        let sql = format!(
            r#"
            INSERT INTO lessons (public_id, group_id, lesson_date, start_datetime, end_datetime, status, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (group_id, lesson_date) DO NOTHING
            RETURNING {}
            "#,
            LESSON_COLUMNS
        );

        let row = sqlx::query_as::<_, LessonRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(lesson.group_id)
            .bind(lesson.lesson_date)
            .bind(lesson.start_datetime)
            .bind(lesson.end_datetime)
            .bind(LessonStatus::Scheduled.as_str())
            .bind(lesson.created_by)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Lesson::try_from).transpose()
    }

    /// Find lesson by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Lesson>> {
        let sql = format!("SELECT {} FROM lessons WHERE id = $1", LESSON_COLUMNS);
        let row = sqlx::query_as::<_, LessonRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Lesson::try_from).transpose()
    }

    /// Lessons of a group within an inclusive date range
    pub async fn list_for_group(&self, group_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Lesson>> {
        let sql = format!(
            "SELECT {} FROM lessons WHERE group_id = $1 AND lesson_date BETWEEN $2 AND $3 ORDER BY lesson_date ASC",
            LESSON_COLUMNS
        );
        let rows = sqlx::query_as::<_, LessonRow>(&sql)
            .bind(group_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Lesson::try_from).collect()
    }

    /// Lessons on a calendar date
    pub async fn list_on_date(&self, date: NaiveDate) -> Result<Vec<Lesson>> {
        let sql = format!(
            "SELECT {} FROM lessons WHERE lesson_date = $1 ORDER BY start_datetime ASC, id ASC",
            LESSON_COLUMNS
        );
        let rows = sqlx::query_as::<_, LessonRow>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Lesson::try_from).collect()
    }

    /// Conditional update driven by a typed patch, on a caller-owned connection so it
    /// can share a transaction with the change log
    pub async fn update_if_status(
        conn: &mut PgConnection,
        id: i64,
        expected: LessonStatus,
        patch: &LessonPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Lesson>> {
        let mut builder = build_update(id, expected, patch, now);
        let row = builder
            .build_query_as::<LessonRow>()
            .fetch_optional(conn)
            .await?;

        row.map(Lesson::try_from).transpose()
    }
}

/// One parameterized UPDATE for whatever fields the patch carries
fn build_update<'a>(id: i64, expected: LessonStatus, patch: &LessonPatch, now: DateTime<Utc>) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE lessons SET updated_at = ");
    builder.push_bind(now);

    if let Some(status) = patch.status {
        builder.push(", status = ").push_bind(status.as_str());
    }
    if let Some(topic) = &patch.topic {
        builder.push(", topic = ").push_bind(topic.clone());
    }
    if let Some(by) = patch.topic_set_by {
        builder.push(", topic_set_by = ").push_bind(by);
    }
    if let Some(at) = patch.topic_set_at {
        builder.push(", topic_set_at = ").push_bind(at);
    }
    if let Some(notes) = &patch.notes {
        builder.push(", notes = ").push_bind(notes.clone());
    }
    if let Some(by) = patch.notes_set_by {
        builder.push(", notes_set_by = ").push_bind(by);
    }
    if let Some(at) = patch.notes_set_at {
        builder.push(", notes_set_at = ").push_bind(at);
    }
    if let Some(by) = patch.reported_by {
        builder.push(", reported_by = ").push_bind(by);
    }
    if let Some(at) = patch.reported_at {
        builder.push(", reported_at = ").push_bind(at);
    }
    if let Some(via) = patch.reported_via {
        builder.push(", reported_via = ").push_bind(via.as_str());
    }

    builder.push(" WHERE id = ").push_bind(id);
    builder.push(" AND status = ").push_bind(expected.as_str());
    builder.push(" RETURNING ").push(LESSON_COLUMNS);
    builder
}
