//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, DatabaseConfig, create_pool, run_migrations, health_check};
pub use memory::MemoryScheduleStore;
pub use repositories::{AttendanceRepository, ChangeLogRepository, GroupRepository, LessonRepository, PeopleRepository};
pub use service::DatabaseService;
pub use store::ScheduleStore;
