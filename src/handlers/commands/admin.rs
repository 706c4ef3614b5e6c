//! Admin command handlers

use teloxide::{Bot, types::Message, prelude::*};
use tracing::{info, debug, warn};
use crate::handlers::user_message;
use crate::models::EXTERNAL_ACTOR_ID;
use crate::services::{ServiceFactory, totals};
use crate::utils::errors::{CourseDeskError, Result};
use crate::utils::helpers::parse_timezone;
use crate::utils::logging::log_admin_action;

/// `<group_id> [weeks]`
pub fn parse_generate_args(args: &str, default_weeks: u32) -> Result<(i64, u32)> {
    let mut parts = args.split_whitespace();
    let group_id = parts
        .next()
        .ok_or_else(|| CourseDeskError::Validation("Usage: /generate <group_id> [weeks]".to_string()))?
        .parse::<i64>()
        .map_err(|_| CourseDeskError::Validation("Group id must be a number".to_string()))?;
    let weeks = match parts.next() {
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| CourseDeskError::Validation("Weeks must be a positive number".to_string()))?,
        None => default_weeks,
    };
    if parts.next().is_some() {
        return Err(CourseDeskError::Validation("Usage: /generate <group_id> [weeks]".to_string()));
    }
    Ok((group_id, weeks))
}

/// `[months]`
pub fn parse_months_arg(args: &str, default_months: u32) -> Result<u32> {
    match args.trim() {
        "" => Ok(default_months),
        value => value
            .parse::<u32>()
            .map_err(|_| CourseDeskError::Validation("Usage: /generate_all [months]".to_string())),
    }
}

/// Admin gate shared by the commands below. Replies and returns `None` for non-admins.
async fn require_admin(bot: &Bot, msg: &Message, services: &ServiceFactory, action: &str) -> Result<Option<i64>> {
    let user_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0 as i64)
        .ok_or_else(|| CourseDeskError::Validation("No user in message".to_string()))?;

    if !services.is_admin(user_id) {
        warn!(user_id = user_id, action = action, "Unauthorized admin command attempt");
        bot.send_message(msg.chat.id, "❌ This command is available to administrators only.").await?;
        return Ok(None);
    }
    Ok(Some(user_id))
}

/// Handle /generate <group_id> [weeks]
pub async fn handle_generate(bot: Bot, msg: Message, args: String, services: ServiceFactory) -> Result<()> {
    let Some(admin_id) = require_admin(&bot, &msg, &services, "generate").await? else {
        return Ok(());
    };

    let (group_id, weeks) = match parse_generate_args(&args, services.settings.scheduling.default_weeks_ahead) {
        Ok(parsed) => parsed,
        Err(e) => {
            bot.send_message(msg.chat.id, user_message(&e)).await?;
            return Ok(());
        }
    };

    debug!(admin_id = admin_id, group_id = group_id, weeks = weeks, "Processing /generate");
    let text = match services.scheduler.generate_for_group(group_id, weeks, EXTERNAL_ACTOR_ID).await {
        Ok(summary) => {
            log_admin_action(admin_id, "generate", Some(&group_id.to_string()), Some(&format!("weeks={}", weeks)));
            format!(
                "✅ Group {}: {} lessons generated, {} already existed.",
                group_id, summary.generated, summary.skipped
            )
        }
        Err(e) => user_message(&e),
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Handle /generate_all [months]
pub async fn handle_generate_all(bot: Bot, msg: Message, args: String, services: ServiceFactory) -> Result<()> {
    let Some(admin_id) = require_admin(&bot, &msg, &services, "generate_all").await? else {
        return Ok(());
    };

    let months = match parse_months_arg(&args, services.settings.scheduling.default_months_ahead) {
        Ok(months) => months,
        Err(e) => {
            bot.send_message(msg.chat.id, user_message(&e)).await?;
            return Ok(());
        }
    };

    let results = services
        .scheduler
        .generate_for_all(services.settings.scheduling.default_weeks_ahead, EXTERNAL_ACTOR_ID, Some(months))
        .await?;
    let sum = totals(&results);
    log_admin_action(admin_id, "generate_all", None, Some(&format!("months={}", months)));

    let mut text = format!(
        "✅ {} groups processed: {} lessons generated, {} already existed.",
        results.len(),
        sum.generated,
        sum.skipped
    );
    for failed in results.iter().filter(|r| !r.is_ok()) {
        text.push_str(&format!(
            "\n⚠️ {} (#{}): {}",
            failed.group_name,
            failed.group_id,
            failed.error.as_deref().unwrap_or_default()
        ));
    }

    bot.send_message(msg.chat.id, text).await?;
    info!(admin_id = admin_id, groups = results.len(), "Bulk generation requested from chat");
    Ok(())
}

/// Handle /remind
pub async fn handle_remind(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let Some(admin_id) = require_admin(&bot, &msg, &services, "remind").await? else {
        return Ok(());
    };

    let tz = parse_timezone(&services.settings.scheduling.school_timezone)?;
    let today = services.clock.today_in(tz);
    let stats = services.notification.remind_day(today).await?;
    log_admin_action(admin_id, "remind", Some(&today.to_string()), None);

    bot.send_message(
        msg.chat.id,
        format!(
            "🔔 Reminders for {}: {} sent, {} teachers without Telegram, {} failed.",
            today.format("%d.%m.%Y"),
            stats.sent,
            stats.unreachable,
            stats.failed
        ),
    )
    .await?;
    Ok(())
}
