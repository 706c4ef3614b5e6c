//! Service fixtures backed by the in-memory store and a fixed clock

use std::sync::Arc;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use teloxide::Bot;
use CourseDesk::config::Settings;
use CourseDesk::database::{MemoryScheduleStore, ScheduleStore};
use CourseDesk::models::{Actor, CreateGroupRequest, Group, GroupStatus, Lesson, Student, Teacher};
use CourseDesk::services::ServiceFactory;
use CourseDesk::state::{MemoryPendingStore, PendingActionStore};
use CourseDesk::utils::clock::{Clock, FixedClock};

pub const TEST_BOT_TOKEN: &str = "123456789:TEST-coursedesk-token";
pub const ADMIN_TELEGRAM_ID: i64 = 1000;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().expect("valid instant")
}

pub fn admin() -> Actor {
    Actor::admin(1, "School Admin")
}

pub fn field_teacher(telegram_id: i64) -> Actor {
    Actor::external(telegram_id.to_string(), "Field Teacher")
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = TEST_BOT_TOKEN.to_string();
    settings.bot.admin_ids = vec![ADMIN_TELEGRAM_ID];
    settings
}

/// Fully wired services over [`MemoryScheduleStore`]
pub struct Fixture {
    pub store: Arc<MemoryScheduleStore>,
    pub clock: FixedClock,
    pub services: ServiceFactory,
}

impl Fixture {
    pub fn at(now: DateTime<Utc>) -> Self {
        let store = Arc::new(MemoryScheduleStore::new());
        let clock = FixedClock::new(now);
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let pending: Arc<dyn PendingActionStore> = Arc::new(MemoryPendingStore::new(300, shared_clock.clone()));
        let dyn_store: Arc<dyn ScheduleStore> = store.clone();

        let services = ServiceFactory::new(
            Bot::new(TEST_BOT_TOKEN),
            test_settings(),
            dyn_store,
            pending,
            shared_clock,
        );

        Self { store, clock, services }
    }

    pub fn teacher(&self, name: &str, telegram_id: Option<i64>) -> Teacher {
        self.store.add_teacher(name, telegram_id).expect("teacher")
    }

    pub fn student(&self, name: &str) -> Student {
        self.store.add_student(name).expect("student")
    }

    pub fn group_with(&self, teacher_id: i64, timezone: &str, start_date: NaiveDate, end_date: Option<NaiveDate>) -> Group {
        let request = CreateGroupRequest {
            name: format!("Group of teacher {}", teacher_id),
            teacher_id,
            weekly_day: 5,
            start_time: NaiveTime::from_hms_opt(11, 30, 0).expect("time"),
            duration_minutes: 90,
            timezone: timezone.to_string(),
            start_date,
            end_date,
            status: GroupStatus::Active,
        };
        self.store.add_group(request, self.clock.now()).expect("group")
    }

    /// Fridays 11:30 for 90 minutes, UTC, starting 2024-01-12
    pub fn friday_group(&self, teacher_id: i64) -> Group {
        self.group_with(teacher_id, "UTC", date(2024, 1, 12), None)
    }

    pub async fn lesson_on(&self, group_id: i64, lesson_date: NaiveDate) -> Lesson {
        self.services
            .scheduler
            .create_single_lesson(group_id, lesson_date, 1)
            .await
            .expect("lesson")
    }

    pub async fn reload(&self, lesson_id: i64) -> Lesson {
        self.store.find_lesson(lesson_id).await.expect("store").expect("lesson exists")
    }
}
