//! Effective teacher resolution

use std::sync::Arc;
use tracing::debug;
use crate::database::ScheduleStore;
use crate::models::Lesson;
use crate::utils::errors::{CourseDeskError, Result};

/// Maps a lesson to the teacher who actually runs it
#[derive(Clone)]
pub struct ReplacementResolver {
    store: Arc<dyn ScheduleStore>,
}

impl ReplacementResolver {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    pub async fn effective_teacher(&self, lesson_id: i64) -> Result<i64> {
        let lesson = self
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or_else(|| CourseDeskError::lesson_not_found(lesson_id))?;
        self.effective_teacher_for(&lesson).await
    }

    /// Same as [`Self::effective_teacher`] for an already loaded lesson
    pub async fn effective_teacher_for(&self, lesson: &Lesson) -> Result<i64> {
        if let Some(replacement) = self.store.find_replacement(lesson.id).await? {
            debug!(
                lesson_id = lesson.id,
                teacher_id = replacement.replacement_teacher_id,
                "Lesson has a replacement teacher"
            );
            return Ok(replacement.replacement_teacher_id);
        }

        let group = self
            .store
            .find_group(lesson.group_id)
            .await?
            .ok_or_else(|| CourseDeskError::group_not_found(lesson.group_id))?;
        Ok(group.teacher_id)
    }
}
