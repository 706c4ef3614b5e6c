//! Start command handler
//!
//! Tells the user whether their Telegram account is recognized

use teloxide::{Bot, types::Message, prelude::*};
use tracing::debug;
use crate::middleware::WebAppGate;
use crate::services::{Caller, ServiceFactory};
use crate::utils::errors::{CourseDeskError, Result};

/// Handle /start command
pub async fn handle_start(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        CourseDeskError::Validation("No user in message".to_string())
    })?;

    let user_id = user.id.0 as i64;
    let chat_id = msg.chat.id;

    debug!(user_id = user_id, chat_id = ?chat_id, "Processing /start command");

    if !chat_id.is_user() {
        bot.send_message(chat_id, "Please message me in a private chat.").await?;
        return Ok(());
    }

    let gate = WebAppGate::new(&services);
    let text = match gate.resolve_caller(user_id).await {
        Ok(Caller::Admin) => format!(
            "👋 Hello, {}! You are signed in as an administrator.\n\nUse /help to see the available commands.",
            user.first_name
        ),
        Ok(Caller::Teacher(_)) => format!(
            "👋 Hello, {}! Use /today to see your lessons and report topics and notes.",
            user.first_name
        ),
        Err(CourseDeskError::Forbidden(_)) => format!(
            "👋 Hello, {}! Your Telegram account (id {}) is not linked to a teacher yet. \
             Please ask the school administrator to add it.",
            user.first_name, user_id
        ),
        Err(e) => return Err(e),
    };

    bot.send_message(chat_id, text).await?;
    Ok(())
}
