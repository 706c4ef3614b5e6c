//! State storage implementation
//!
//! Redis-backed pending actions. Expiry is delegated to Redis (`SET ... EX`) so the
//! correlation survives restarts and is shared between bot instances.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::sync::Arc;
use tracing::{debug, error};
use crate::config::RedisConfig;
use crate::state::pending::{PendingAction, PendingActionStore, PendingField};
use crate::utils::clock::Clock;
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct RedisPendingStore {
    /// Redis connection manager
    connection_manager: redis::aio::ConnectionManager,
    prefix: String,
    ttl_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl RedisPendingStore {
    /// Connect using the application's Redis settings
    pub async fn new(config: &RedisConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            prefix: config.prefix.clone(),
            ttl_seconds: config.pending_ttl_seconds,
            clock,
        })
    }

    fn key(&self, external_id: &str, field: PendingField) -> String {
        pending_key(&self.prefix, external_id, field)
    }

    /// Check Redis health
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

pub(crate) fn pending_key(prefix: &str, external_id: &str, field: PendingField) -> String {
    format!("{}pending:{}:{}", prefix, external_id, field.as_str())
}

#[async_trait]
impl PendingActionStore for RedisPendingStore {
    async fn begin(&self, external_id: &str, field: PendingField, lesson_id: i64) -> Result<PendingAction> {
        let action = PendingAction {
            external_id: external_id.to_string(),
            field,
            lesson_id,
            created_at: self.clock.now(),
        };
        let serialized = serde_json::to_string(&action)?;

        let mut conn = self.connection_manager.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for other in PendingField::ALL.iter().filter(|f| **f != field) {
            pipe.del(self.key(external_id, *other)).ignore();
        }
        pipe.set_ex(self.key(external_id, field), serialized, self.ttl_seconds).ignore();

        match pipe.query_async::<_, ()>(&mut conn).await {
            Ok(()) => {
                debug!(external_id = external_id, field = field.as_str(), lesson_id = lesson_id, "Pending action stored");
                Ok(action)
            }
            Err(e) => {
                error!(external_id = external_id, error = %e, "Failed to store pending action");
                Err(e.into())
            }
        }
    }

    async fn take(&self, external_id: &str, field: PendingField) -> Result<Option<PendingAction>> {
        let key = self.key(external_id, field);
        let mut conn = self.connection_manager.clone();

        let (serialized, _deleted): (Option<String>, u32) = redis::pipe()
            .atomic()
            .get(&key)
            .del(&key)
            .query_async(&mut conn)
            .await?;

        match serialized {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn clear(&self, external_id: &str) -> Result<()> {
        let keys: Vec<String> = PendingField::ALL.iter().map(|f| self.key(external_id, *f)).collect();
        let mut conn = self.connection_manager.clone();
        let deleted: u32 = conn.del(keys).await?;
        debug!(external_id = external_id, deleted = deleted, "Pending actions cleared");
        Ok(())
    }
}
