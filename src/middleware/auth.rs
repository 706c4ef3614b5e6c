//! Authentication middleware
//!
//! Gate in front of every mini-app request and every bot update that touches a lesson:
//! identifies the caller (administrator or teacher) and checks lesson access.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::database::ScheduleStore;
use crate::models::Actor;
use crate::services::{AccessPolicy, Caller, InitDataVerifier, ServiceFactory, VerifiedInitData};
use crate::utils::errors::{CourseDeskError, Result};

/// Authenticated mini-app request
#[derive(Debug, Clone, PartialEq)]
pub struct WebAppSession {
    pub init_data: VerifiedInitData,
    pub caller: Caller,
    pub actor: Actor,
}

#[derive(Clone)]
pub struct WebAppGate {
    verifier: InitDataVerifier,
    store: Arc<dyn ScheduleStore>,
    access: AccessPolicy,
    admin_ids: HashSet<i64>,
}

impl WebAppGate {
    pub fn new(services: &ServiceFactory) -> Self {
        Self {
            verifier: services.verifier.clone(),
            store: services.store.clone(),
            access: services.access.clone(),
            admin_ids: services.settings.bot.admin_ids.iter().copied().collect(),
        }
    }

    /// Map a Telegram user to a caller; unknown users are rejected
    pub async fn resolve_caller(&self, telegram_id: i64) -> Result<Caller> {
        if self.admin_ids.contains(&telegram_id) {
            debug!(telegram_id = telegram_id, "Caller is an administrator");
            return Ok(Caller::Admin);
        }

        match self.store.find_teacher_by_telegram_id(telegram_id).await? {
            Some(teacher) => Ok(Caller::Teacher(teacher.id)),
            None => {
                warn!(telegram_id = telegram_id, "Telegram user is not linked to a teacher");
                Err(CourseDeskError::Forbidden("Telegram account is not linked to a teacher".to_string()))
            }
        }
    }

    /// Verify `initData` and identify the caller
    pub async fn authenticate(&self, init_data: &str) -> Result<WebAppSession> {
        let verified = self.verifier.verify(init_data)?;
        let caller = self.resolve_caller(verified.telegram_id).await?;
        let actor = Actor::external(verified.external_user_id.clone(), verified.display_name.clone());

        Ok(WebAppSession {
            init_data: verified,
            caller,
            actor,
        })
    }

    /// [`Self::authenticate`] plus access to `lesson_id`
    pub async fn authorize_lesson(&self, init_data: &str, lesson_id: i64) -> Result<WebAppSession> {
        let session = self.authenticate(init_data).await?;
        self.access.authorize(lesson_id, session.caller).await?;
        Ok(session)
    }
}
