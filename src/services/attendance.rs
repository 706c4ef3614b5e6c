//! Attendance ledger
//!
//! Upserts per-student attendance, logging status changes in the same store write,
//! and completes a scheduled lesson on its first mark.

use std::sync::Arc;
use tracing::info;
use crate::database::ScheduleStore;
use crate::models::{Actor, Attendance, AttendanceStatus, Channel, LessonStatus};
use crate::services::audit::ChangeAudit;
use crate::services::lifecycle::LessonLifecycle;
use crate::utils::clock::Clock;
use crate::utils::errors::{CourseDeskError, Result};
use crate::utils::helpers::parse_timezone;
use crate::utils::logging::log_attendance;

/// Result of a single attendance write
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceOutcome {
    pub attendance: Attendance,
    /// Lesson status after the write
    pub lesson_status: LessonStatus,
    /// This write moved the lesson from `scheduled` to `done`
    pub completed_lesson: bool,
}

#[derive(Clone)]
pub struct AttendanceLedger {
    store: Arc<dyn ScheduleStore>,
    lifecycle: LessonLifecycle,
    clock: Arc<dyn Clock>,
}

impl AttendanceLedger {
    pub fn new(store: Arc<dyn ScheduleStore>, lifecycle: LessonLifecycle, clock: Arc<dyn Clock>) -> Self {
        Self { store, lifecycle, clock }
    }

    pub async fn set_attendance(
        &self,
        lesson_id: i64,
        student_id: i64,
        raw_status: &str,
        actor: &Actor,
        channel: Channel,
    ) -> Result<AttendanceOutcome> {
        let stamp = ChangeAudit::stamp(actor, channel)?;
        let status = AttendanceStatus::normalize(raw_status)?;

        let lesson = self
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or_else(|| CourseDeskError::lesson_not_found(lesson_id))?;

        match self.store.find_student(student_id).await? {
            Some(student) if !student.is_deleted => {}
            _ => return Err(CourseDeskError::NotFound { entity: "Student", id: student_id }),
        }

        if !lesson.status.can_transition_to(LessonStatus::Done) {
            return Err(CourseDeskError::InvalidTransition {
                from: lesson.status.as_str().to_string(),
                to: LessonStatus::Done.as_str().to_string(),
            });
        }

        if channel.is_field_channel() {
            let group = self
                .store
                .find_group(lesson.group_id)
                .await?
                .ok_or_else(|| CourseDeskError::group_not_found(lesson.group_id))?;
            let today = self.clock.today_in(parse_timezone(&group.timezone)?);
            if lesson.lesson_date < today {
                return Err(CourseDeskError::PastLessonLocked {
                    lesson_id,
                    lesson_date: lesson.lesson_date,
                });
            }
        }

        let write = self
            .store
            .upsert_attendance(lesson_id, student_id, status, &stamp, self.clock.now())
            .await?;
        log_attendance(lesson_id, student_id, status.as_str(), channel.as_str());

        let (lesson_status, completed_lesson) = if lesson.status == LessonStatus::Scheduled {
            let (updated, transitioned) = self.lifecycle.complete(lesson_id, actor, channel).await?;
            if transitioned {
                info!(lesson_id = lesson_id, "Lesson completed by first attendance mark");
            }
            (updated.status, transitioned)
        } else {
            (lesson.status, false)
        };

        Ok(AttendanceOutcome {
            attendance: write.attendance,
            lesson_status,
            completed_lesson,
        })
    }

    /// Attendance rows of a lesson
    pub async fn list(&self, lesson_id: i64) -> Result<Vec<Attendance>> {
        if self.store.find_lesson(lesson_id).await?.is_none() {
            return Err(CourseDeskError::lesson_not_found(lesson_id));
        }
        self.store.list_attendance(lesson_id).await
    }
}
