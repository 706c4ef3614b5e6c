//! State management module
//!
//! This module handles short-lived conversation state for the Telegram channel

pub mod pending;
pub mod storage;

// Re-export commonly used state components
pub use pending::{MemoryPendingStore, PendingAction, PendingActionStore, PendingField};
pub use storage::RedisPendingStore;
