//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod actor;
pub mod attendance;
pub mod change_log;
pub mod group;
pub mod lesson;
pub mod people;

// Re-export commonly used models
pub use actor::{Actor, Channel, EXTERNAL_ACTOR_ID};
pub use attendance::{Attendance, AttendanceRow, AttendanceStatus, AttendanceWrite};
pub use change_log::{attendance_field, AuditStamp, ChangeLogEntry, NewChangeLogEntry};
pub use group::{Group, GroupStatus, CreateGroupRequest};
pub use lesson::{Lesson, LessonRow, LessonStatus, LessonPatch, NewLesson, FieldChange};
pub use people::{Teacher, Student, TeacherReplacement};
