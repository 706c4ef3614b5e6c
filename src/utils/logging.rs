//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the CourseDesk application.

use std::path::Path;
use tracing::{info, warn, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::{CourseDeskError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop and must outlive the application.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let path = Path::new(&config.file_path);
    let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "coursedesk.log".to_string());

    let file_appender = tracing_appender::rolling::daily(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| CourseDeskError::Config(format!("Failed to install log subscriber: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log the outcome of generating lessons for one group
pub fn log_generation(group_id: i64, generated: u32, skipped: u32, error: Option<&str>) {
    match error {
        None => info!(
            group_id = group_id,
            generated = generated,
            skipped = skipped,
            "Lesson generation completed"
        ),
        Some(error) => warn!(
            group_id = group_id,
            error = error,
            "Lesson generation failed for group"
        ),
    }
}

/// Log a lesson status transition
pub fn log_lesson_transition(lesson_id: i64, from: &str, to: &str, channel: &str) {
    info!(
        lesson_id = lesson_id,
        from = from,
        to = to,
        channel = channel,
        "Lesson status changed"
    );
}

/// Log an attendance write
pub fn log_attendance(lesson_id: i64, student_id: i64, status: &str, channel: &str) {
    debug!(
        lesson_id = lesson_id,
        student_id = student_id,
        status = status,
        channel = channel,
        "Attendance recorded"
    );
}

/// Log a rejected initData. The reason is deliberately not part of the record.
pub fn log_auth_failure(source: &str) {
    warn!(source = source, "Mini-app authentication rejected");
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}
