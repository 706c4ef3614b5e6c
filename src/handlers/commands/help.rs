//! Help command handler

use teloxide::{Bot, types::Message, prelude::*};
use crate::utils::errors::Result;

/// Handle /help command
pub async fn handle_help(bot: Bot, msg: Message) -> Result<()> {
    let help_text = "📚 CourseDesk Help\n\n\
        /start - Link your account\n\
        /today - Your lessons today, with buttons to report topic and notes\n\
        /help - Show this help message\n\n\
        Administrators:\n\
        /generate <group_id> [weeks] - Generate lessons for a group\n\
        /generate_all [months] - Generate lessons for all active groups\n\
        /remind - Send today's reminders to teachers";

    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}
