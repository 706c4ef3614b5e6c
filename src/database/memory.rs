//! In-process [`ScheduleStore`]
//!
//! Mirrors the Postgres constraints under a single mutex: one lesson per
//! `(group_id, lesson_date)`, one attendance row per `(lesson_id, student_id)`,
//! one replacement per lesson, and status-conditional lesson updates.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use crate::database::store::ScheduleStore;
use crate::models::*;
use crate::utils::errors::{CourseDeskError, Result};

#[derive(Debug, Default)]
struct Tables {
    teachers: BTreeMap<i64, Teacher>,
    students: BTreeMap<i64, Student>,
    groups: BTreeMap<i64, Group>,
    lessons: BTreeMap<i64, Lesson>,
    lesson_keys: HashMap<(i64, NaiveDate), i64>,
    attendance: BTreeMap<(i64, i64), Attendance>,
    replacements: HashMap<i64, TeacherReplacement>,
    change_logs: Vec<ChangeLogEntry>,
    next_id: i64,
    fail_next_audit_write: bool,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Consume an injected audit failure, before anything of the write is applied
    fn check_audit_write(&mut self, appends: bool) -> Result<()> {
        if appends && self.fail_next_audit_write {
            self.fail_next_audit_write = false;
            return Err(CourseDeskError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "change log append failed",
            )));
        }
        Ok(())
    }

    fn append_log(&mut self, entry: NewChangeLogEntry, now: DateTime<Utc>) -> ChangeLogEntry {
        let stored = ChangeLogEntry {
            id: self.next_id(),
            lesson_id: entry.lesson_id,
            field_name: entry.field_name,
            old_value: entry.old_value,
            new_value: entry.new_value,
            changed_by: entry.changed_by,
            changed_by_name: entry.changed_by_name,
            changed_by_external_id: entry.changed_by_external_id,
            changed_via: entry.changed_via,
            created_at: now,
        };
        self.change_logs.push(stored.clone());
        stored
    }
}

#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    tables: Mutex<Tables>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| CourseDeskError::Io(std::io::Error::new(std::io::ErrorKind::Other, "memory store poisoned")))
    }

    pub fn add_teacher(&self, full_name: &str, telegram_id: Option<i64>) -> Result<Teacher> {
        let mut tables = self.lock()?;
        let teacher = Teacher {
            id: tables.next_id(),
            full_name: full_name.to_string(),
            telegram_id,
            is_deleted: false,
        };
        tables.teachers.insert(teacher.id, teacher.clone());
        Ok(teacher)
    }

    pub fn add_student(&self, full_name: &str) -> Result<Student> {
        let mut tables = self.lock()?;
        let student = Student {
            id: tables.next_id(),
            full_name: full_name.to_string(),
            is_deleted: false,
        };
        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    pub fn add_group(&self, request: CreateGroupRequest, now: DateTime<Utc>) -> Result<Group> {
        let mut tables = self.lock()?;
        let group = Group {
            id: tables.next_id(),
            name: request.name,
            teacher_id: request.teacher_id,
            weekly_day: request.weekly_day,
            start_time: request.start_time,
            duration_minutes: request.duration_minutes,
            timezone: request.timezone,
            start_date: request.start_date,
            end_date: request.end_date,
            status: request.status.as_str().to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    /// Replace a stored group wholesale (fixture setup: archive, break a timezone, ...)
    pub fn put_group(&self, group: Group) -> Result<()> {
        self.lock()?.groups.insert(group.id, group);
        Ok(())
    }

    /// Assign a substitute teacher; at most one per lesson
    pub fn add_replacement(&self, lesson_id: i64, replacement_teacher_id: i64) -> Result<TeacherReplacement> {
        let mut tables = self.lock()?;
        if tables.replacements.contains_key(&lesson_id) {
            return Err(CourseDeskError::Conflict(format!("Lesson {} already has a replacement", lesson_id)));
        }
        let replacement = TeacherReplacement { lesson_id, replacement_teacher_id };
        tables.replacements.insert(lesson_id, replacement.clone());
        Ok(replacement)
    }

    /// Make the next write that appends to the change log fail as a whole
    pub fn fail_next_audit_write(&self) -> Result<()> {
        self.lock()?.fail_next_audit_write = true;
        Ok(())
    }

    pub fn lesson_count(&self) -> Result<usize> {
        Ok(self.lock()?.lessons.len())
    }

    pub fn attendance_count(&self) -> Result<usize> {
        Ok(self.lock()?.attendance.len())
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn find_group(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.lock()?.groups.get(&id).cloned())
    }

    async fn list_schedulable_groups(&self) -> Result<Vec<Group>> {
        Ok(self.lock()?.groups.values().filter(|g| g.is_schedulable()).cloned().collect())
    }

    async fn insert_lesson_if_absent(&self, lesson: NewLesson, now: DateTime<Utc>) -> Result<Option<Lesson>> {
        let mut tables = self.lock()?;
        let key = (lesson.group_id, lesson.lesson_date);
        if tables.lesson_keys.contains_key(&key) {
            return Ok(None);
        }

        let stored = Lesson {
            id: tables.next_id(),
            public_id: Uuid::new_v4(),
            group_id: lesson.group_id,
            lesson_date: lesson.lesson_date,
            start_datetime: lesson.start_datetime,
            end_datetime: lesson.end_datetime,
            status: LessonStatus::Scheduled,
            topic: None,
            notes: None,
            topic_set_by: None,
            topic_set_at: None,
            notes_set_by: None,
            notes_set_at: None,
            reported_by: None,
            reported_at: None,
            reported_via: None,
            created_by: Some(lesson.created_by),
            created_at: now,
            updated_at: now,
        };
        tables.lesson_keys.insert(key, stored.id);
        tables.lessons.insert(stored.id, stored.clone());
        Ok(Some(stored))
    }

    async fn find_lesson(&self, id: i64) -> Result<Option<Lesson>> {
        Ok(self.lock()?.lessons.get(&id).cloned())
    }

    async fn list_group_lessons(&self, group_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Lesson>> {
        let tables = self.lock()?;
        let mut lessons: Vec<Lesson> = tables
            .lessons
            .values()
            .filter(|l| l.group_id == group_id && l.lesson_date >= from && l.lesson_date <= to)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.lesson_date);
        Ok(lessons)
    }

    async fn list_lessons_on(&self, date: NaiveDate) -> Result<Vec<Lesson>> {
        let tables = self.lock()?;
        let mut lessons: Vec<Lesson> = tables.lessons.values().filter(|l| l.lesson_date == date).cloned().collect();
        lessons.sort_by_key(|l| (l.start_datetime, l.id));
        Ok(lessons)
    }

    async fn update_lesson(
        &self,
        id: i64,
        expected: LessonStatus,
        patch: &LessonPatch,
        audit: &[NewChangeLogEntry],
        now: DateTime<Utc>,
    ) -> Result<Option<Lesson>> {
        let mut tables = self.lock()?;
        if tables.lessons.get(&id).map(|l| l.status) != Some(expected) {
            return Ok(None);
        }
        tables.check_audit_write(!audit.is_empty())?;

        let updated = match tables.lessons.get_mut(&id) {
            Some(lesson) => {
                patch.apply_to(lesson, now);
                lesson.clone()
            }
            None => return Ok(None),
        };
        for entry in audit {
            tables.append_log(entry.clone(), now);
        }
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
        let mut tables = self.lock()?;
        let previous = tables.attendance.get(&(lesson_id, student_id)).map(|a| a.status);
        let changed = previous != Some(status);
        tables.check_audit_write(changed)?;

        let attendance = Attendance {
            lesson_id,
            student_id,
            status,
            updated_by: Some(stamp.changed_by),
            updated_at: now,
        };
        tables.attendance.insert((lesson_id, student_id), attendance.clone());
        if changed {
            let entry = stamp.entry(
                lesson_id,
                attendance_field(student_id),
                previous.map(|p| p.as_str().to_string()),
                Some(status.as_str().to_string()),
            );
            tables.append_log(entry, now);
        }
        Ok(AttendanceWrite { attendance, previous })
    }

    async fn list_attendance(&self, lesson_id: i64) -> Result<Vec<Attendance>> {
        Ok(self
            .lock()?
            .attendance
            .values()
            .filter(|a| a.lesson_id == lesson_id)
            .cloned()
            .collect())
    }

    async fn find_replacement(&self, lesson_id: i64) -> Result<Option<TeacherReplacement>> {
        Ok(self.lock()?.replacements.get(&lesson_id).cloned())
    }

    async fn append_change_log(&self, entry: NewChangeLogEntry, now: DateTime<Utc>) -> Result<ChangeLogEntry> {
        let mut tables = self.lock()?;
        tables.check_audit_write(true)?;
        Ok(tables.append_log(entry, now))
    }

    async fn list_change_logs(&self, lesson_id: i64) -> Result<Vec<ChangeLogEntry>> {
        Ok(self
            .lock()?
            .change_logs
            .iter()
            .filter(|e| e.lesson_id == lesson_id)
            .cloned()
            .collect())
    }

    async fn find_teacher(&self, id: i64) -> Result<Option<Teacher>> {
        Ok(self.lock()?.teachers.get(&id).cloned())
    }

    async fn find_teacher_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Teacher>> {
        Ok(self
            .lock()?
            .teachers
            .values()
            .find(|t| !t.is_deleted && t.telegram_id == Some(telegram_id))
            .cloned())
    }

    async fn find_student(&self, id: i64) -> Result<Option<Student>> {
        Ok(self.lock()?.students.get(&id).cloned())
    }
}
