//! Notification service implementation
//!
//! Lesson reminders delivered over Telegram to the effective teacher of each lesson.

use std::sync::Arc;
use chrono::NaiveDate;
use teloxide::{Bot, requests::Requester, types::ChatId};
use tracing::{info, warn, error, debug};
use crate::database::ScheduleStore;
use crate::models::{Group, Lesson, LessonStatus};
use crate::services::replacement::ReplacementResolver;
use crate::utils::errors::{CourseDeskError, Result};
use crate::utils::helpers::parse_timezone;

/// A reminder ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub lesson_id: i64,
    pub teacher_id: i64,
    pub chat_id: ChatId,
    pub text: String,
}

/// Outcome of a day's reminders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderStats {
    pub sent: u32,
    /// Teacher without a linked Telegram account
    pub unreachable: u32,
    pub failed: u32,
}

/// Reminder text for a lesson, with times shown in the group's timezone
pub fn format_reminder(lesson: &Lesson, group: &Group) -> String {
    let (start, end) = match parse_timezone(&group.timezone) {
        Ok(tz) => (
            lesson.start_datetime.with_timezone(&tz).format("%H:%M").to_string(),
            lesson.end_datetime.with_timezone(&tz).format("%H:%M").to_string(),
        ),
        Err(_) => (
            lesson.start_datetime.format("%H:%M UTC").to_string(),
            lesson.end_datetime.format("%H:%M UTC").to_string(),
        ),
    };

    let mut text = format!(
        "📅 Lesson reminder\n\nGroup: {}\nDate: {}\nTime: {}–{}",
        group.name,
        lesson.lesson_date.format("%d.%m.%Y"),
        start,
        end
    );
    if let Some(topic) = &lesson.topic {
        text.push_str(&format!("\nTopic: {}", topic));
    }
    text
}

#[derive(Clone)]
pub struct NotificationService {
    bot: Bot,
    store: Arc<dyn ScheduleStore>,
    resolver: ReplacementResolver,
}

impl NotificationService {
    pub fn new(bot: Bot, store: Arc<dyn ScheduleStore>, resolver: ReplacementResolver) -> Self {
        Self { bot, store, resolver }
    }

    /// Resolve recipient and text; `None` when the effective teacher has no Telegram account
    pub async fn prepare_reminder(&self, lesson_id: i64) -> Result<Option<Reminder>> {
        let lesson = self
            .store
            .find_lesson(lesson_id)
            .await?
            .ok_or_else(|| CourseDeskError::lesson_not_found(lesson_id))?;
        let group = self
            .store
            .find_group(lesson.group_id)
            .await?
            .ok_or_else(|| CourseDeskError::group_not_found(lesson.group_id))?;

        let teacher_id = self.resolver.effective_teacher_for(&lesson).await?;
        let teacher = self
            .store
            .find_teacher(teacher_id)
            .await?
            .ok_or(CourseDeskError::NotFound { entity: "Teacher", id: teacher_id })?;

        let Some(telegram_id) = teacher.telegram_id else {
            debug!(lesson_id = lesson_id, teacher_id = teacher_id, "Teacher has no Telegram account");
            return Ok(None);
        };

        Ok(Some(Reminder {
            lesson_id,
            teacher_id,
            chat_id: ChatId(telegram_id),
            text: format_reminder(&lesson, &group),
        }))
    }

    /// Send a reminder for one lesson. Returns `false` if the teacher is unreachable.
    pub async fn remind_lesson(&self, lesson_id: i64) -> Result<bool> {
        match self.prepare_reminder(lesson_id).await? {
            Some(reminder) => {
                self.send(&reminder).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remind the effective teachers of every scheduled lesson on `date`
    pub async fn remind_day(&self, date: NaiveDate) -> Result<ReminderStats> {
        let lessons = self.store.list_lessons_on(date).await?;
        let mut stats = ReminderStats::default();

        for lesson in lessons.iter().filter(|l| l.status == LessonStatus::Scheduled) {
            match self.remind_lesson(lesson.id).await {
                Ok(true) => stats.sent += 1,
                Ok(false) => stats.unreachable += 1,
                Err(e) => {
                    warn!(lesson_id = lesson.id, error = %e, "Reminder not delivered");
                    stats.failed += 1;
                }
            }
        }

        info!(date = %date, sent = stats.sent, unreachable = stats.unreachable, failed = stats.failed, "Daily reminders processed");
        Ok(stats)
    }

    async fn send(&self, reminder: &Reminder) -> Result<()> {
        match self.bot.send_message(reminder.chat_id, reminder.text.clone()).await {
            Ok(_) => {
                info!(lesson_id = reminder.lesson_id, teacher_id = reminder.teacher_id, "Reminder sent");
                Ok(())
            }
            Err(e) => {
                error!(lesson_id = reminder.lesson_id, chat_id = ?reminder.chat_id, error = %e, "Failed to send reminder");
                Err(CourseDeskError::Telegram(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_reminder_uses_group_timezone() {
        let start = Utc.with_ymd_and_hms(2024, 1, 12, 8, 30, 0).unwrap();
        let group = Group {
            id: 1,
            name: "Salsa A".to_string(),
            teacher_id: 1,
            weekly_day: 5,
            start_time: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
            duration_minutes: 90,
            timezone: "Europe/Moscow".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            end_date: None,
            status: "active".to_string(),
            is_deleted: false,
            created_at: start,
            updated_at: start,
        };
        let lesson = Lesson {
            id: 9,
            public_id: Uuid::new_v4(),
            group_id: 1,
            lesson_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            start_datetime: start,
            end_datetime: start + chrono::Duration::minutes(90),
            status: LessonStatus::Scheduled,
            topic: Some("Cross-body lead".to_string()),
            notes: None,
            topic_set_by: None,
            topic_set_at: None,
            notes_set_by: None,
            notes_set_at: None,
            reported_by: None,
            reported_at: None,
            reported_via: None,
            created_by: Some(1),
            created_at: start,
            updated_at: start,
        };

        let text = format_reminder(&lesson, &group);
        assert!(text.contains("Group: Salsa A"));
        assert!(text.contains("Date: 12.01.2024"));
        assert!(text.contains("Time: 11:30–13:00"));
        assert!(text.contains("Topic: Cross-body lead"));
    }
}
