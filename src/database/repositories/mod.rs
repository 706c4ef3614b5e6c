//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod attendance;
pub mod change_log;
pub mod group;
pub mod lesson;
pub mod people;

// Re-export repositories
pub use attendance::AttendanceRepository;
pub use change_log::ChangeLogRepository;
pub use group::GroupRepository;
pub use lesson::LessonRepository;
pub use people::PeopleRepository;
