//! CourseDesk
//!
//! Scheduling core of a course-school backend: recurring lesson generation, the
//! lesson lifecycle, the attendance ledger, a change audit, and verification of
//! Telegram mini-app `initData`, together with the Telegram bot that teachers use
//! to report lessons.

#![allow(non_snake_case)]

pub mod config;
pub mod handlers;
pub mod services;
pub mod models;
pub mod database;
pub mod state;
pub mod utils;
pub mod middleware;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{CourseDeskError, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, MemoryScheduleStore, ScheduleStore};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
