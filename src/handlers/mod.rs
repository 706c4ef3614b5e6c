//! Bot handlers module
//!
//! This module contains all Telegram bot handlers organized by type:
//! - Command handlers for bot commands
//! - Callback handlers for inline keyboard interactions
//! - Message handlers for free-text replies

pub mod commands;
pub mod callbacks;
pub mod messages;

// Re-export commonly used handler functions
pub use commands::{Command, handle_command};
pub use callbacks::handle_callback_query;
pub use messages::handle_message;

use crate::utils::errors::{CourseDeskError, ErrorSeverity};

/// Text shown to a chat user for a failed operation. Internal failures are not detailed.
pub fn user_message(error: &CourseDeskError) -> String {
    match error {
        CourseDeskError::Validation(message) => format!("⚠️ {}", message),
        CourseDeskError::NotFound { entity, id } => format!("⚠️ {} #{} was not found.", entity, id),
        CourseDeskError::Forbidden(_) => "⛔ You are not allowed to change this lesson.".to_string(),
        CourseDeskError::PastLessonLocked { lesson_date, .. } => {
            format!("🔒 The lesson on {} is in the past and can no longer be edited here.", lesson_date.format("%d.%m.%Y"))
        }
        CourseDeskError::InvalidTransition { from, .. } => format!("⚠️ The lesson is {} and cannot be changed this way.", from),
        CourseDeskError::Conflict(message) => format!("⚠️ {}", message),
        CourseDeskError::AuthInvalid => "⛔ Authentication failed.".to_string(),
        other if other.severity() == ErrorSeverity::Critical => "❌ Internal error, please try again later.".to_string(),
        _ => "❌ Something went wrong, please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_user_messages() {
        let locked = CourseDeskError::PastLessonLocked {
            lesson_id: 1,
            lesson_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
        };
        assert!(user_message(&locked).contains("12.01.2024"));
        assert!(user_message(&CourseDeskError::Config("db password".into())).starts_with("❌ Internal"));
        assert!(!user_message(&CourseDeskError::Forbidden("teacher 5".into())).contains("5"));
    }
}
