//! /today: a teacher's lessons for the current day

use teloxide::{Bot, types::{Message, InlineKeyboardMarkup, InlineKeyboardButton}, payloads::SendMessageSetters, prelude::*};
use tracing::debug;
use crate::middleware::WebAppGate;
use crate::models::{Lesson, LessonStatus};
use crate::services::{Caller, ServiceFactory};
use crate::state::PendingField;
use crate::utils::errors::{CourseDeskError, Result};
use crate::utils::helpers::{parse_timezone, truncate_text};

/// Callback payload for a lesson button, e.g. `topic:42`
pub fn callback_data(field: PendingField, lesson_id: i64) -> String {
    format!("{}:{}", field.as_str(), lesson_id)
}

/// Topic/notes buttons for one lesson
pub fn lesson_keyboard(lesson: &Lesson) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("📝 Topic", callback_data(PendingField::Topic, lesson.id)),
        InlineKeyboardButton::callback("🗒 Notes", callback_data(PendingField::Notes, lesson.id)),
    ]])
}

/// One-line summary of a lesson
pub fn describe_lesson(lesson: &Lesson, tz: chrono_tz::Tz) -> String {
    let status = match lesson.status {
        LessonStatus::Scheduled => "⏳",
        LessonStatus::Done => "✅",
        LessonStatus::Canceled => "❌",
    };
    let mut text = format!(
        "{} {} (lesson #{})",
        status,
        lesson.start_datetime.with_timezone(&tz).format("%H:%M"),
        lesson.id
    );
    if let Some(topic) = &lesson.topic {
        text.push_str(&format!("\nTopic: {}", truncate_text(topic, 80)));
    }
    text
}

/// Handle /today command
pub async fn handle_today(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        CourseDeskError::Validation("No user in message".to_string())
    })?;
    let user_id = user.id.0 as i64;
    let chat_id = msg.chat.id;

    let caller = match WebAppGate::new(&services).resolve_caller(user_id).await {
        Ok(caller) => caller,
        Err(CourseDeskError::Forbidden(_)) => {
            bot.send_message(chat_id, "Your Telegram account is not linked to a teacher.").await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let tz = parse_timezone(&services.settings.scheduling.school_timezone)?;
    let today = services.clock.today_in(tz);
    let lessons = services.store.list_lessons_on(today).await?;

    let mut visible = Vec::new();
    for lesson in lessons {
        let allowed = match caller {
            Caller::Admin => true,
            Caller::Teacher(teacher_id) => services.resolver.effective_teacher_for(&lesson).await? == teacher_id,
        };
        if allowed {
            visible.push(lesson);
        }
    }

    debug!(user_id = user_id, date = %today, lessons = visible.len(), "Listing today's lessons");

    if visible.is_empty() {
        bot.send_message(chat_id, format!("No lessons on {}.", today.format("%d.%m.%Y"))).await?;
        return Ok(());
    }

    for lesson in &visible {
        let mut request = bot.send_message(chat_id, describe_lesson(lesson, tz));
        if lesson.status != LessonStatus::Canceled {
            request = request.reply_markup(lesson_keyboard(lesson));
        }
        request.await?;
    }

    Ok(())
}
