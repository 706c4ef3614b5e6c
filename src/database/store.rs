//! Storage seam for the scheduling core
//!
//! Services talk to storage only through [`ScheduleStore`]. Uniqueness of
//! `(group_id, lesson_date)` and `(lesson_id, student_id)` and the status
//! precondition of lesson updates are enforced by the implementation, never by a
//! read-then-write in the services.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crate::models::*;
use crate::utils::errors::Result;

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn find_group(&self, id: i64) -> Result<Option<Group>>;

    /// Groups with `status = active` and `is_deleted = false`, ordered by id
    async fn list_schedulable_groups(&self) -> Result<Vec<Group>>;

    /// Insert a `scheduled` lesson unless one already exists for its
    /// `(group_id, lesson_date)`. Returns `None` on conflict; the existing row is untouched.
    async fn insert_lesson_if_absent(&self, lesson: NewLesson, now: DateTime<Utc>) -> Result<Option<Lesson>>;

    async fn find_lesson(&self, id: i64) -> Result<Option<Lesson>>;

    /// Lessons of a group with `from <= lesson_date <= to`, ordered by date
    async fn list_group_lessons(&self, group_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Lesson>>;

    /// All lessons on a date, ordered by start time
    async fn list_lessons_on(&self, date: NaiveDate) -> Result<Vec<Lesson>>;

    /// Apply `patch` if the lesson's status is still `expected` and append `audit`
    /// in the same atomic write. Returns `None`, writing nothing, when the lesson is
    /// missing or its status moved on. A failed audit append leaves the lesson untouched.
    async fn update_lesson(
        &self,
        id: i64,
        expected: LessonStatus,
        patch: &LessonPatch,
        audit: &[NewChangeLogEntry],
        now: DateTime<Utc>,
    ) -> Result<Option<Lesson>>;

    /// Atomic insert-or-update keyed by `(lesson_id, student_id)`. When the status
    /// differs from the stored one, an [`attendance_field`] entry stamped with `stamp`
    /// is appended in the same write; `updated_by` is the stamp's `changed_by`.
    async fn upsert_attendance(
        &self,
        lesson_id: i64,
        student_id: i64,
        status: AttendanceStatus,
        stamp: &AuditStamp,
        now: DateTime<Utc>,
    ) -> Result<AttendanceWrite>;

    async fn list_attendance(&self, lesson_id: i64) -> Result<Vec<Attendance>>;

    async fn find_replacement(&self, lesson_id: i64) -> Result<Option<TeacherReplacement>>;

    async fn append_change_log(&self, entry: NewChangeLogEntry, now: DateTime<Utc>) -> Result<ChangeLogEntry>;

    /// Entries for a lesson in insertion order
    async fn list_change_logs(&self, lesson_id: i64) -> Result<Vec<ChangeLogEntry>>;

    async fn find_teacher(&self, id: i64) -> Result<Option<Teacher>>;

    async fn find_teacher_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Teacher>>;

    async fn find_student(&self, id: i64) -> Result<Option<Student>>;
}
