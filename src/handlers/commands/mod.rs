//! Command handlers module
//!
//! This module contains handlers for all bot commands like /start, /today, /generate

pub mod admin;
pub mod help;
pub mod start;
pub mod today;

use teloxide::{Bot, types::Message, utils::command::BotCommands};
use crate::utils::errors::Result;
use crate::services::ServiceFactory;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "CourseDesk commands:")]
pub enum Command {
    #[command(description = "Link your Telegram account and show the menu")]
    Start,
    #[command(description = "Show help information")]
    Help,
    #[command(description = "Your lessons today")]
    Today,
    #[command(description = "Generate lessons for a group: /generate <group_id> [weeks] (admin only)")]
    Generate(String),
    #[command(description = "Generate lessons for all active groups: /generate_all [months] (admin only)")]
    GenerateAll(String),
    #[command(description = "Send today's lesson reminders (admin only)")]
    Remind,
}

/// Main command dispatcher
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, services: ServiceFactory) -> Result<()> {
    match cmd {
        Command::Start => start::handle_start(bot, msg, services).await,
        Command::Help => help::handle_help(bot, msg).await,
        Command::Today => today::handle_today(bot, msg, services).await,
        Command::Generate(args) => admin::handle_generate(bot, msg, args, services).await,
        Command::GenerateAll(args) => admin::handle_generate_all(bot, msg, args, services).await,
        Command::Remind => admin::handle_remind(bot, msg, services).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/today", "coursedesk_bot").unwrap(), Command::Today);
        assert_eq!(
            Command::parse("/generate 12 4", "coursedesk_bot").unwrap(),
            Command::Generate("12 4".to_string())
        );
        assert_eq!(
            Command::parse("/generate_all 3", "coursedesk_bot").unwrap(),
            Command::GenerateAll("3".to_string())
        );
    }
}
