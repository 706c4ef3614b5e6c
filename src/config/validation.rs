//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{CourseDeskError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_scheduling_config(&settings.scheduling)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(CourseDeskError::Config(
            "Bot token is required".to_string()
        ));
    }

    if config.admin_ids.is_empty() {
        return Err(CourseDeskError::Config(
            "At least one admin ID must be configured".to_string()
        ));
    }

    if config.init_data_max_age_seconds <= 0 {
        return Err(CourseDeskError::Config(
            "initData max age must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CourseDeskError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(CourseDeskError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(CourseDeskError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CourseDeskError::Config(
            "Redis URL is required".to_string()
        ));
    }

    if config.pending_ttl_seconds == 0 {
        return Err(CourseDeskError::Config(
            "Pending action TTL must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate lesson generation defaults
fn validate_scheduling_config(config: &super::SchedulingConfig) -> Result<()> {
    if config.default_weeks_ahead == 0 {
        return Err(CourseDeskError::Config(
            "Default weeks ahead must be greater than 0".to_string()
        ));
    }

    if config.default_months_ahead == 0 {
        return Err(CourseDeskError::Config(
            "Default months ahead must be greater than 0".to_string()
        ));
    }

    if config.default_weeks_ahead > config.max_weeks_ahead {
        return Err(CourseDeskError::Config(
            format!("Default weeks ahead exceeds the maximum of {}", config.max_weeks_ahead)
        ));
    }

    if config.default_months_ahead > config.max_months_ahead {
        return Err(CourseDeskError::Config(
            format!("Default months ahead exceeds the maximum of {}", config.max_months_ahead)
        ));
    }

    if config.school_timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(CourseDeskError::Config(
            format!("Unknown school timezone: {}", config.school_timezone)
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(CourseDeskError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(CourseDeskError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bot.token = "123:abc".to_string();
        settings.bot.admin_ids = vec![42];
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let mut settings = valid_settings();
        settings.bot.token.clear();
        assert!(matches!(validate_settings(&settings), Err(CourseDeskError::Config(_))));
    }

    #[test]
    fn test_connection_bounds_rejected() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let mut settings = valid_settings();
        settings.scheduling.school_timezone = "Mars/Olympus".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_default_window_above_maximum_rejected() {
        let mut settings = valid_settings();
        settings.scheduling.default_weeks_ahead = settings.scheduling.max_weeks_ahead + 1;
        assert!(matches!(validate_settings(&settings), Err(CourseDeskError::Config(_))));

        let mut settings = valid_settings();
        settings.scheduling.max_months_ahead = 1;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_zero_pending_ttl_rejected() {
        let mut settings = valid_settings();
        settings.redis.pending_ttl_seconds = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut settings = valid_settings();
        settings.logging.level = "loud".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
