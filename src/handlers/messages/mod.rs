//! Message handlers module
//!
//! Free-text replies that complete a pending topic/notes prompt

use teloxide::{Bot, types::Message, prelude::*};
use tracing::{info, debug};
use crate::handlers::user_message;
use crate::middleware::WebAppGate;
use crate::models::{Actor, Channel};
use crate::services::ServiceFactory;
use crate::state::PendingField;
use crate::utils::errors::{CourseDeskError, Result};

/// Handle incoming text messages
pub async fn handle_message(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        CourseDeskError::Validation("No user in message".to_string())
    })?;

    let user_id = user.id.0 as i64;
    let chat_id = msg.chat.id;

    if !chat_id.is_user() {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let external_id = user_id.to_string();
    let Some(pending) = services.pending.take_any(&external_id).await? else {
        debug!(user_id = user_id, "Text message without a pending action");
        bot.send_message(chat_id, "Use /today to pick a lesson, then press Topic or Notes.").await?;
        return Ok(());
    };

    let gate = WebAppGate::new(&services);
    let authorized = match gate.resolve_caller(user_id).await {
        Ok(caller) => services.access.authorize(pending.lesson_id, caller).await,
        Err(e) => Err(e),
    };
    if let Err(e) = authorized {
        bot.send_message(chat_id, user_message(&e)).await?;
        return Ok(());
    }

    let display_name = match &user.last_name {
        Some(last) => format!("{} {}", user.first_name, last),
        None => user.first_name.clone(),
    };
    let actor = Actor::external(external_id, display_name);

    let result = match pending.field {
        PendingField::Topic => services.lifecycle.set_topic(pending.lesson_id, text, &actor, Channel::Telegram).await,
        PendingField::Notes => services.lifecycle.set_notes(pending.lesson_id, text, &actor, Channel::Telegram).await,
    };

    let reply = match result {
        Ok(lesson) => {
            info!(user_id = user_id, lesson_id = lesson.id, field = pending.field.as_str(), "Lesson field updated from chat");
            format!("✅ Saved {} for lesson #{}.", pending.field.as_str(), lesson.id)
        }
        Err(e) => user_message(&e),
    };

    bot.send_message(chat_id, reply).await?;
    Ok(())
}
