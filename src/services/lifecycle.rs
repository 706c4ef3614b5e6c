//! Lesson lifecycle: status transitions and topic/notes provenance
//!
//! Every mutation is planned against the currently stored lesson and written, together
//! with its change-log entries, by one status-conditional store write. When the row
//! changed status in between, the plan is recomputed against the fresh row.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use crate::database::ScheduleStore;
use crate::models::{Actor, Channel, Lesson, LessonPatch, LessonStatus};
use crate::services::audit::ChangeAudit;
use crate::utils::clock::Clock;
use crate::utils::errors::{CourseDeskError, Result};
use crate::utils::logging::log_lesson_transition;

/// Attempts before a concurrently changing lesson is reported as a conflict
const MAX_ATTEMPTS: usize = 3;

/// Content of a teacher report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonReport {
    pub topic: Option<String>,
    pub notes: Option<String>,
}

/// Lesson after a lifecycle call and whether this call wrote anything
struct Applied {
    lesson: Lesson,
    changed: bool,
}

#[derive(Clone)]
pub struct LessonLifecycle {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
}

impl LessonLifecycle {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn set_topic(&self, lesson_id: i64, text: &str, actor: &Actor, channel: Channel) -> Result<Lesson> {
        let topic = clean_text("topic", text)?;
        self.apply(lesson_id, actor, channel, |lesson, now| {
            ensure_editable(lesson)?;
            if lesson.topic.as_deref() == Some(topic.as_str()) {
                return Ok(None);
            }
            Ok(Some(LessonPatch {
                topic: Some(topic.clone()),
                topic_set_by: Some(actor.user_id),
                topic_set_at: Some(now),
                ..Default::default()
            }))
        })
        .await
        .map(|applied| applied.lesson)
    }

    pub async fn set_notes(&self, lesson_id: i64, text: &str, actor: &Actor, channel: Channel) -> Result<Lesson> {
        let notes = clean_text("notes", text)?;
        self.apply(lesson_id, actor, channel, |lesson, now| {
            ensure_editable(lesson)?;
            if lesson.notes.as_deref() == Some(notes.as_str()) {
                return Ok(None);
            }
            Ok(Some(LessonPatch {
                notes: Some(notes.clone()),
                notes_set_by: Some(actor.user_id),
                notes_set_at: Some(now),
                ..Default::default()
            }))
        })
        .await
        .map(|applied| applied.lesson)
    }

    /// `scheduled -> done`; already done is a no-op
    pub async fn mark_done(&self, lesson_id: i64, actor: &Actor, channel: Channel) -> Result<Lesson> {
        self.complete(lesson_id, actor, channel).await.map(|(lesson, _)| lesson)
    }

    /// [`Self::mark_done`], also telling whether this call performed the transition.
    /// `false` when the lesson was already done, e.g. completed by a concurrent writer.
    pub async fn complete(&self, lesson_id: i64, actor: &Actor, channel: Channel) -> Result<(Lesson, bool)> {
        let applied = self
            .apply(lesson_id, actor, channel, |lesson, now| {
                if lesson.status == LessonStatus::Done {
                    return Ok(None);
                }
                ensure_transition(lesson.status, LessonStatus::Done)?;
                Ok(Some(completion(actor, channel, now)))
            })
            .await?;
        Ok((applied.lesson, applied.changed))
    }

    /// `scheduled -> canceled`; already canceled is a no-op
    pub async fn cancel(&self, lesson_id: i64, actor: &Actor) -> Result<Lesson> {
        self.apply(lesson_id, actor, Channel::Admin, |lesson, _| {
            if lesson.status == LessonStatus::Canceled {
                return Ok(None);
            }
            ensure_transition(lesson.status, LessonStatus::Canceled)?;
            Ok(Some(LessonPatch {
                status: Some(LessonStatus::Canceled),
                ..Default::default()
            }))
        })
        .await
        .map(|applied| applied.lesson)
    }

    /// Topic and/or notes plus completion as a single transition. Writes both the
    /// topic/notes provenance and the `reported_*` projection.
    pub async fn report(&self, lesson_id: i64, report: &LessonReport, actor: &Actor, channel: Channel) -> Result<Lesson> {
        let topic = report.topic.as_deref().map(|t| clean_text("topic", t)).transpose()?;
        let notes = report.notes.as_deref().map(|n| clean_text("notes", n)).transpose()?;

        self.apply(lesson_id, actor, channel, |lesson, now| {
            ensure_editable(lesson)?;

            let mut patch = if lesson.status == LessonStatus::Scheduled {
                completion(actor, channel, now)
            } else {
                LessonPatch::default()
            };
            if let Some(topic) = topic.as_ref().filter(|t| lesson.topic.as_ref() != Some(*t)) {
                patch.topic = Some(topic.clone());
                patch.topic_set_by = Some(actor.user_id);
                patch.topic_set_at = Some(now);
            }
            if let Some(notes) = notes.as_ref().filter(|n| lesson.notes.as_ref() != Some(*n)) {
                patch.notes = Some(notes.clone());
                patch.notes_set_by = Some(actor.user_id);
                patch.notes_set_at = Some(now);
            }

            Ok(if patch.is_empty() { None } else { Some(patch) })
        })
        .await
        .map(|applied| applied.lesson)
    }

    async fn apply<F>(&self, lesson_id: i64, actor: &Actor, channel: Channel, plan: F) -> Result<Applied>
    where
        F: Fn(&Lesson, DateTime<Utc>) -> Result<Option<LessonPatch>>,
    {
        let stamp = ChangeAudit::stamp(actor, channel)?;

        for attempt in 1..=MAX_ATTEMPTS {
            let current = self
                .store
                .find_lesson(lesson_id)
                .await?
                .ok_or_else(|| CourseDeskError::lesson_not_found(lesson_id))?;

            let now = self.clock.now();
            let patch = match plan(&current, now)? {
                Some(patch) => patch,
                None => {
                    debug!(lesson_id = lesson_id, "Lesson already in requested state");
                    return Ok(Applied { lesson: current, changed: false });
                }
            };
            let audit = ChangeAudit::entries(lesson_id, &patch.changes_against(&current), &stamp);

            match self.store.update_lesson(lesson_id, current.status, &patch, &audit, now).await? {
                Some(updated) => {
                    if updated.status != current.status {
                        log_lesson_transition(lesson_id, current.status.as_str(), updated.status.as_str(), channel.as_str());
                    }
                    return Ok(Applied { lesson: updated, changed: true });
                }
                None => {
                    warn!(lesson_id = lesson_id, attempt = attempt, "Lesson changed concurrently, replanning");
                }
            }
        }

        Err(CourseDeskError::Conflict(format!("Lesson {} is being modified concurrently", lesson_id)))
    }
}

fn completion(actor: &Actor, channel: Channel, now: DateTime<Utc>) -> LessonPatch {
    LessonPatch {
        status: Some(LessonStatus::Done),
        reported_by: Some(actor.user_id),
        reported_at: Some(now),
        reported_via: Some(channel),
        ..Default::default()
    }
}

/// Content edits keep the status, which is only possible outside `canceled`
fn ensure_editable(lesson: &Lesson) -> Result<()> {
    if lesson.status.is_terminal() {
        return Err(invalid(lesson.status, lesson.status));
    }
    Ok(())
}

fn ensure_transition(from: LessonStatus, to: LessonStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(invalid(from, to))
    }
}

fn invalid(from: LessonStatus, to: LessonStatus) -> CourseDeskError {
    CourseDeskError::InvalidTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

fn clean_text(field: &str, text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CourseDeskError::Validation(format!("Lesson {} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}
