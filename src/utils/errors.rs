//! Error handling for CourseDesk
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for CourseDesk application
#[derive(Error, Debug)]
pub enum CourseDeskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Lesson {lesson_id} on {lesson_date} is in the past and locked for field edits")]
    PastLessonLocked { lesson_id: i64, lesson_date: NaiveDate },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Authentication failed")]
    AuthInvalid,
}

/// Result type alias for CourseDesk operations
pub type Result<T> = std::result::Result<T, CourseDeskError>;

impl CourseDeskError {
    /// Shorthand for a missing lesson
    pub fn lesson_not_found(id: i64) -> Self {
        CourseDeskError::NotFound { entity: "Lesson", id }
    }

    /// Shorthand for a missing group
    pub fn group_not_found(id: i64) -> Self {
        CourseDeskError::NotFound { entity: "Group", id }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CourseDeskError::Database(_) => ErrorSeverity::Critical,
            CourseDeskError::Migration(_) => ErrorSeverity::Critical,
            CourseDeskError::Config(_) => ErrorSeverity::Critical,
            CourseDeskError::Forbidden(_) => ErrorSeverity::Warning,
            CourseDeskError::PastLessonLocked { .. } => ErrorSeverity::Warning,
            CourseDeskError::AuthInvalid => ErrorSeverity::Warning,
            CourseDeskError::Validation(_) => ErrorSeverity::Info,
            CourseDeskError::Conflict(_) => ErrorSeverity::Info,
            CourseDeskError::InvalidTransition { .. } => ErrorSeverity::Info,
            CourseDeskError::NotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
