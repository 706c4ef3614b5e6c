//! Pending conversation actions
//!
//! A pending action correlates "the bot asked this user for a topic/notes" with the
//! next free-text reply. Entries are one-shot and expire after a TTL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::utils::clock::Clock;
use crate::utils::errors::{CourseDeskError, Result};

/// Lesson field the user is expected to type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingField {
    Topic,
    Notes,
}

impl PendingField {
    pub const ALL: [PendingField; 2] = [PendingField::Topic, PendingField::Notes];

    pub fn as_str(&self) -> &'static str {
        match self {
            PendingField::Topic => "topic",
            PendingField::Notes => "notes",
        }
    }
}

impl std::str::FromStr for PendingField {
    type Err = CourseDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "topic" => Ok(PendingField::Topic),
            "notes" => Ok(PendingField::Notes),
            other => Err(CourseDeskError::Validation(format!("Unknown pending field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub external_id: String,
    pub field: PendingField,
    pub lesson_id: i64,
    pub created_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}

/// Storage for pending actions, keyed by (external identity, field)
#[async_trait]
pub trait PendingActionStore: Send + Sync {
    /// Start waiting for `field` of `lesson_id`. Replaces any earlier pending action of
    /// the same user.
    async fn begin(&self, external_id: &str, field: PendingField, lesson_id: i64) -> Result<PendingAction>;

    /// Remove and return the action for `(external_id, field)` if it has not expired
    async fn take(&self, external_id: &str, field: PendingField) -> Result<Option<PendingAction>>;

    /// Remove every action of the user
    async fn clear(&self, external_id: &str) -> Result<()>;

    /// Remove and return the user's live action regardless of field
    async fn take_any(&self, external_id: &str) -> Result<Option<PendingAction>> {
        let mut latest: Option<PendingAction> = None;
        for field in PendingField::ALL {
            if let Some(action) = self.take(external_id, field).await? {
                if latest.as_ref().map_or(true, |l| action.created_at > l.created_at) {
                    latest = Some(action);
                }
            }
        }
        Ok(latest)
    }
}

/// Process-local implementation for tests and single-instance runs
pub struct MemoryPendingStore {
    entries: Mutex<HashMap<(String, PendingField), PendingAction>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryPendingStore {
    pub fn new(ttl_seconds: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds as i64),
            clock,
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, PendingField), PendingAction>>> {
        self.entries
            .lock()
            .map_err(|_| CourseDeskError::Io(std::io::Error::new(std::io::ErrorKind::Other, "pending store poisoned")))
    }
}

#[async_trait]
impl PendingActionStore for MemoryPendingStore {
    async fn begin(&self, external_id: &str, field: PendingField, lesson_id: i64) -> Result<PendingAction> {
        let action = PendingAction {
            external_id: external_id.to_string(),
            field,
            lesson_id,
            created_at: self.clock.now(),
        };

        let mut entries = self.entries()?;
        entries.retain(|(owner, _), _| owner != external_id);
        entries.insert((external_id.to_string(), field), action.clone());
        debug!(external_id = external_id, field = field.as_str(), lesson_id = lesson_id, "Pending action started");
        Ok(action)
    }

    async fn take(&self, external_id: &str, field: PendingField) -> Result<Option<PendingAction>> {
        let now = self.clock.now();
        let removed = self.entries()?.remove(&(external_id.to_string(), field));
        Ok(removed.filter(|action| !action.is_expired(now, self.ttl)))
    }

    async fn clear(&self, external_id: &str) -> Result<()> {
        self.entries()?.retain(|(owner, _), _| owner != external_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::utils::clock::FixedClock;

    fn store() -> (MemoryPendingStore, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 12, 10, 0, 0).unwrap());
        (MemoryPendingStore::new(300, Arc::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_take_is_one_shot() {
        let (store, _) = store();
        store.begin("777", PendingField::Topic, 5).await.unwrap();
        let action = store.take("777", PendingField::Topic).await.unwrap().unwrap();
        assert_eq!(action.lesson_id, 5);
        assert!(store.take("777", PendingField::Topic).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expires_after_ttl() {
        let (store, clock) = store();
        store.begin("777", PendingField::Notes, 5).await.unwrap();
        clock.advance(chrono::Duration::seconds(299));
        assert!(store.take("777", PendingField::Notes).await.unwrap().is_some());

        store.begin("777", PendingField::Notes, 5).await.unwrap();
        clock.advance(chrono::Duration::seconds(300));
        assert!(store.take("777", PendingField::Notes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_begin_replaces_other_field() {
        let (store, _) = store();
        store.begin("777", PendingField::Topic, 5).await.unwrap();
        store.begin("777", PendingField::Notes, 6).await.unwrap();
        store.begin("888", PendingField::Topic, 7).await.unwrap();

        let action = store.take_any("777").await.unwrap().unwrap();
        assert_eq!((action.field, action.lesson_id), (PendingField::Notes, 6));
        assert!(store.take_any("777").await.unwrap().is_none());

        store.clear("888").await.unwrap();
        assert!(store.take_any("888").await.unwrap().is_none());
    }
}
