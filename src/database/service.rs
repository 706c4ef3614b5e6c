//! Database service layer
//!
//! Postgres-backed [`ScheduleStore`] assembled from the per-table repositories.
//! Lesson and attendance writes share one transaction with their change-log rows.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crate::database::store::ScheduleStore;
use crate::database::{
    DatabasePool, AttendanceRepository, ChangeLogRepository, GroupRepository, LessonRepository, PeopleRepository,
};
use crate::models::*;
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub groups: GroupRepository,
    pub lessons: LessonRepository,
    pub attendance: AttendanceRepository,
    pub change_logs: ChangeLogRepository,
    pub people: PeopleRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            groups: GroupRepository::new(pool.clone()),
            lessons: LessonRepository::new(pool.clone()),
            attendance: AttendanceRepository::new(pool.clone()),
            change_logs: ChangeLogRepository::new(pool.clone()),
            people: PeopleRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl ScheduleStore for DatabaseService {
    async fn find_group(&self, id: i64) -> Result<Option<Group>> {
        self.groups.find_by_id(id).await
    }

    async fn list_schedulable_groups(&self) -> Result<Vec<Group>> {
        self.groups.list_schedulable().await
    }

    async fn insert_lesson_if_absent(&self, lesson: NewLesson, now: DateTime<Utc>) -> Result<Option<Lesson>> {
        self.lessons.insert_if_absent(lesson, now).await
    }

    async fn find_lesson(&self, id: i64) -> Result<Option<Lesson>> {
        self.lessons.find_by_id(id).await
    }

    async fn list_group_lessons(&self, group_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Lesson>> {
        self.lessons.list_for_group(group_id, from, to).await
    }

    async fn list_lessons_on(&self, date: NaiveDate) -> Result<Vec<Lesson>> {
        self.lessons.list_on_date(date).await
    }

    async fn update_lesson(
        &self,
        id: i64,
        expected: LessonStatus,
        patch: &LessonPatch,
        audit: &[NewChangeLogEntry],
        now: DateTime<Utc>,
    ) -> Result<Option<Lesson>> {
        let mut tx = self.pool.begin().await?;

        let Some(updated) = LessonRepository::update_if_status(&mut tx, id, expected, patch, now).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        for entry in audit {
            ChangeLogRepository::append_on(&mut tx, entry.clone(), now).await?;
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn upsert_attendance(
        &self,
        lesson_id: i64,
        student_id: i64,
        status: AttendanceStatus,
        stamp: &AuditStamp,
        now: DateTime<Utc>,
    ) -> Result<AttendanceWrite> {
        let mut tx = self.pool.begin().await?;

        let write = AttendanceRepository::upsert(&mut tx, lesson_id, student_id, status, Some(stamp.changed_by), now).await?;
        if write.previous != Some(status) {
            let entry = stamp.entry(
                lesson_id,
                attendance_field(student_id),
                write.previous.map(|p| p.as_str().to_string()),
                Some(status.as_str().to_string()),
            );
            ChangeLogRepository::append_on(&mut tx, entry, now).await?;
        }

        tx.commit().await?;
        Ok(write)
    }

    async fn list_attendance(&self, lesson_id: i64) -> Result<Vec<Attendance>> {
        self.attendance.list_for_lesson(lesson_id).await
    }

    async fn find_replacement(&self, lesson_id: i64) -> Result<Option<TeacherReplacement>> {
        self.people.find_replacement(lesson_id).await
    }

    async fn append_change_log(&self, entry: NewChangeLogEntry, now: DateTime<Utc>) -> Result<ChangeLogEntry> {
        self.change_logs.append(entry, now).await
    }

    async fn list_change_logs(&self, lesson_id: i64) -> Result<Vec<ChangeLogEntry>> {
        self.change_logs.list_for_lesson(lesson_id).await
    }

    async fn find_teacher(&self, id: i64) -> Result<Option<Teacher>> {
        self.people.find_teacher(id).await
    }

    async fn find_teacher_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Teacher>> {
        self.people.find_teacher_by_telegram_id(telegram_id).await
    }

    async fn find_student(&self, id: i64) -> Result<Option<Student>> {
        self.people.find_student(id).await
    }
}
