//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub scheduling: SchedulingConfig,
    pub logging: LoggingConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Bot token; also the shared secret for mini-app initData signatures
    pub token: String,
    pub admin_ids: Vec<i64>,
    #[serde(default = "default_init_data_max_age")]
    pub init_data_max_age_seconds: i64,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_seconds: u64,
}

/// Lesson generation defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulingConfig {
    pub default_weeks_ahead: u32,
    pub default_months_ahead: u32,
    /// Largest window a generation request may ask for
    #[serde(default = "default_max_weeks_ahead")]
    pub max_weeks_ahead: u32,
    #[serde(default = "default_max_months_ahead")]
    pub max_months_ahead: u32,
    pub school_timezone: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

fn default_init_data_max_age() -> i64 {
    86_400
}

fn default_pending_ttl() -> u64 {
    300
}

fn default_max_weeks_ahead() -> u32 {
    104
}

fn default_max_months_ahead() -> u32 {
    24
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = Settings::default();
        let settings = config::Config::builder()
            .set_default("bot.admin_ids", Vec::<i64>::new())?
            .set_default("bot.init_data_max_age_seconds", defaults.bot.init_data_max_age_seconds)?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default("database.min_connections", defaults.database.min_connections)?
            .set_default("redis.url", defaults.redis.url)?
            .set_default("redis.prefix", defaults.redis.prefix)?
            .set_default("redis.pending_ttl_seconds", defaults.redis.pending_ttl_seconds)?
            .set_default("scheduling.default_weeks_ahead", defaults.scheduling.default_weeks_ahead)?
            .set_default("scheduling.default_months_ahead", defaults.scheduling.default_months_ahead)?
            .set_default("scheduling.max_weeks_ahead", defaults.scheduling.max_weeks_ahead)?
            .set_default("scheduling.max_months_ahead", defaults.scheduling.max_months_ahead)?
            .set_default("scheduling.school_timezone", defaults.scheduling.school_timezone)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.file_path", defaults.logging.file_path)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("COURSEDESK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bot.admin_ids")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::CourseDeskError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
                admin_ids: vec![],
                init_data_max_age_seconds: default_init_data_max_age(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/coursedesk".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                prefix: "coursedesk:".to_string(),
                pending_ttl_seconds: default_pending_ttl(),
            },
            scheduling: SchedulingConfig {
                default_weeks_ahead: 8,
                default_months_ahead: 2,
                max_weeks_ahead: default_max_weeks_ahead(),
                max_months_ahead: default_max_months_ahead(),
                school_timezone: "UTC".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs/coursedesk.log".to_string(),
            },
        }
    }
}
