//! Callback query handlers module
//!
//! Inline buttons under a lesson (`topic:<id>`, `notes:<id>`) start a pending action;
//! the next free-text message of the user fills the field.

use teloxide::{Bot, types::{CallbackQuery, ChatId}, prelude::*};
use tracing::{info, debug, warn};
use crate::handlers::user_message;
use crate::middleware::WebAppGate;
use crate::services::ServiceFactory;
use crate::state::PendingField;
use crate::utils::errors::Result;

/// Parse `<field>:<lesson_id>`
pub fn parse_callback(data: &str) -> Option<(PendingField, i64)> {
    let (field, lesson_id) = data.split_once(':')?;
    Some((field.parse().ok()?, lesson_id.parse().ok()?))
}

/// Main callback query dispatcher
pub async fn handle_callback_query(bot: Bot, query: CallbackQuery, services: ServiceFactory) -> Result<()> {
    let user_id = query.from.id.0 as i64;
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    debug!(user_id = user_id, callback_data = ?query.data, "Processing callback query");

    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        warn!(error = %e, callback_id = %query.id, "Failed to answer callback query");
    }

    let Some((field, lesson_id)) = query.data.as_deref().and_then(parse_callback) else {
        warn!(user_id = user_id, callback_data = ?query.data, "Invalid callback data format");
        return Ok(());
    };

    let gate = WebAppGate::new(&services);
    let authorized = match gate.resolve_caller(user_id).await {
        Ok(caller) => services.access.authorize(lesson_id, caller).await,
        Err(e) => Err(e),
    };
    if let Err(e) = authorized {
        bot.send_message(chat_id, user_message(&e)).await?;
        return Ok(());
    }

    services.pending.begin(&user_id.to_string(), field, lesson_id).await?;
    info!(user_id = user_id, lesson_id = lesson_id, field = field.as_str(), "Waiting for lesson field text");

    let prompt = match field {
        PendingField::Topic => format!("✍️ Send the topic for lesson #{}.", lesson_id),
        PendingField::Notes => format!("✍️ Send the notes for lesson #{}.", lesson_id),
    };
    bot.send_message(chat_id, prompt).await?;
    Ok(())
}
