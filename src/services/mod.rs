//! Services module
//!
//! This module contains business logic services

pub mod attendance;
pub mod audit;
pub mod auth;
pub mod lifecycle;
pub mod notification;
pub mod replacement;
pub mod scheduler;

// Re-export commonly used services
pub use attendance::{AttendanceLedger, AttendanceOutcome};
pub use audit::ChangeAudit;
pub use auth::{AccessPolicy, Caller, InitDataVerifier, VerifiedInitData, sign_init_data};
pub use lifecycle::{LessonLifecycle, LessonReport};
pub use notification::{NotificationService, Reminder, ReminderStats, format_reminder};
pub use replacement::ReplacementResolver;
pub use scheduler::{GenerationLimits, GenerationResult, GenerationSummary, GenerationWindow, RecurrenceGenerator, totals};

use std::sync::Arc;
use teloxide::Bot;
use crate::config::settings::Settings;
use crate::database::ScheduleStore;
use crate::state::PendingActionStore;
use crate::utils::clock::Clock;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub settings: Settings,
    pub store: Arc<dyn ScheduleStore>,
    pub pending: Arc<dyn PendingActionStore>,
    pub clock: Arc<dyn Clock>,
    pub verifier: InitDataVerifier,
    pub resolver: ReplacementResolver,
    pub access: AccessPolicy,
    pub audit: ChangeAudit,
    pub lifecycle: LessonLifecycle,
    pub attendance: AttendanceLedger,
    pub scheduler: RecurrenceGenerator,
    pub notification: NotificationService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        bot: Bot,
        settings: Settings,
        store: Arc<dyn ScheduleStore>,
        pending: Arc<dyn PendingActionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let verifier = InitDataVerifier::new(
            settings.bot.token.clone(),
            settings.bot.init_data_max_age_seconds,
            clock.clone(),
        );
        let resolver = ReplacementResolver::new(store.clone());
        let access = AccessPolicy::new(resolver.clone());
        let audit = ChangeAudit::new(store.clone(), clock.clone());
        let lifecycle = LessonLifecycle::new(store.clone(), clock.clone());
        let attendance = AttendanceLedger::new(store.clone(), lifecycle.clone(), clock.clone());
        let scheduler = RecurrenceGenerator::new(store.clone(), clock.clone())
            .with_limits(GenerationLimits::from(&settings.scheduling));
        let notification = NotificationService::new(bot, store.clone(), resolver.clone());

        Self {
            settings,
            store,
            pending,
            clock,
            verifier,
            resolver,
            access,
            audit,
            lifecycle,
            attendance,
            scheduler,
            notification,
        }
    }

    /// Check if a Telegram user is a bot admin
    pub fn is_admin(&self, telegram_id: i64) -> bool {
        self.settings.bot.admin_ids.contains(&telegram_id)
    }
}
