//! Recurring lesson generation
//!
//! Expands a group's weekly rule into calendar occurrences and inserts the missing
//! lessons. Existing lessons are never touched; the `(group_id, lesson_date)` unique
//! key in the store decides between generated and skipped.

use std::sync::Arc;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::config::SchedulingConfig;
use crate::database::ScheduleStore;
use crate::models::{Group, Lesson, NewLesson};
use crate::utils::clock::Clock;
use crate::utils::errors::{CourseDeskError, Result};
use crate::utils::helpers::{
    end_of_month_ahead, lesson_bounds, next_weekday_on_or_after, parse_timezone, start_of_month, weekday_from_iso,
};
use crate::utils::logging::log_generation;

/// Counts for one group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generated: u32,
    pub skipped: u32,
}

/// Per-group outcome of bulk generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub group_id: i64,
    pub group_name: String,
    pub generated: u32,
    pub skipped: u32,
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Sum of per-group counts
pub fn totals(results: &[GenerationResult]) -> GenerationSummary {
    results.iter().fold(GenerationSummary::default(), |acc, r| GenerationSummary {
        generated: acc.generated + r.generated,
        skipped: acc.skipped + r.skipped,
    })
}

/// Which occurrences to materialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationWindow {
    /// `weeks` weekly occurrences starting at the later of today and the group's start date
    Weeks(u32),
    /// Every occurrence from the start of the current month to the end of the month
    /// `n` months ahead
    Months(u32),
}

/// Upper bounds on a generation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimits {
    pub max_weeks: u32,
    pub max_months: u32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            max_weeks: 104,
            max_months: 24,
        }
    }
}

impl From<&SchedulingConfig> for GenerationLimits {
    fn from(config: &SchedulingConfig) -> Self {
        Self {
            max_weeks: config.max_weeks_ahead,
            max_months: config.max_months_ahead,
        }
    }
}

impl GenerationLimits {
    pub fn check(&self, window: GenerationWindow) -> Result<()> {
        match window {
            GenerationWindow::Weeks(0) | GenerationWindow::Months(0) => {
                Err(CourseDeskError::Validation("Generation window must not be empty".to_string()))
            }
            GenerationWindow::Weeks(weeks) if weeks > self.max_weeks => Err(CourseDeskError::Validation(format!(
                "Cannot generate {} weeks ahead, the limit is {}",
                weeks, self.max_weeks
            ))),
            GenerationWindow::Months(months) if months > self.max_months => Err(CourseDeskError::Validation(format!(
                "Cannot generate {} months ahead, the limit is {}",
                months, self.max_months
            ))),
            _ => Ok(()),
        }
    }
}

/// Occurrence dates of `group` for `window`, given today's date in the group's timezone
pub fn occurrences(
    group: &Group,
    window: GenerationWindow,
    limits: GenerationLimits,
    today: NaiveDate,
) -> Result<Vec<NaiveDate>> {
    limits.check(window)?;
    let weekday = weekday_from_iso(group.weekly_day)?;

    let (from, until) = match window {
        GenerationWindow::Weeks(weeks) => {
            let from = today.max(group.start_date);
            let first = next_weekday_on_or_after(from, weekday);
            let last = first
                .checked_add_days(Days::new(7 * u64::from(weeks - 1)))
                .ok_or_else(|| CourseDeskError::Validation(format!("{} weeks after {} is out of calendar range", weeks, first)))?;
            (from, last)
        }
        GenerationWindow::Months(months) => {
            (start_of_month(today).max(group.start_date), end_of_month_ahead(today, months)?)
        }
    };
    let until = match group.end_date {
        Some(end) => until.min(end),
        None => until,
    };

    let mut dates = Vec::new();
    let mut date = next_weekday_on_or_after(from, weekday);
    while date <= until {
        dates.push(date);
        match date.checked_add_days(Days::new(7)) {
            Some(next) => date = next,
            None => break,
        }
    }
    Ok(dates)
}

#[derive(Clone)]
pub struct RecurrenceGenerator {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
    limits: GenerationLimits,
}

impl RecurrenceGenerator {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            limits: GenerationLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub async fn generate_for_group(&self, group_id: i64, weeks_ahead: u32, actor_id: i64) -> Result<GenerationSummary> {
        let group = self.load_group(group_id).await?;
        let summary = self.generate(&group, GenerationWindow::Weeks(weeks_ahead), actor_id).await?;
        log_generation(group.id, summary.generated, summary.skipped, None);
        Ok(summary)
    }

    /// Generate for every active, non-archived group. A failing group is recorded in
    /// its result and does not stop the others.
    pub async fn generate_for_all(
        &self,
        weeks_ahead: u32,
        actor_id: i64,
        months_ahead: Option<u32>,
    ) -> Result<Vec<GenerationResult>> {
        let window = match months_ahead {
            Some(months) => GenerationWindow::Months(months),
            None => GenerationWindow::Weeks(weeks_ahead),
        };

        let groups = self.store.list_schedulable_groups().await?;
        info!(groups = groups.len(), window = ?window, "Generating lessons for all active groups");

        let mut results = Vec::with_capacity(groups.len());
        for group in groups {
            let result = match self.generate(&group, window, actor_id).await {
                Ok(summary) => {
                    log_generation(group.id, summary.generated, summary.skipped, None);
                    GenerationResult {
                        group_id: group.id,
                        group_name: group.name,
                        generated: summary.generated,
                        skipped: summary.skipped,
                        error: None,
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    log_generation(group.id, 0, 0, Some(&message));
                    GenerationResult {
                        group_id: group.id,
                        group_name: group.name,
                        generated: 0,
                        skipped: 0,
                        error: Some(message),
                    }
                }
            };
            results.push(result);
        }

        Ok(results)
    }

    /// One-off lesson for a group on a given date
    pub async fn create_single_lesson(&self, group_id: i64, lesson_date: NaiveDate, actor_id: i64) -> Result<Lesson> {
        let group = self.load_group(group_id).await?;
        let tz = parse_timezone(&group.timezone)?;
        let (start_datetime, end_datetime) = lesson_bounds(lesson_date, group.start_time, group.duration_minutes, tz)?;

        let lesson = NewLesson {
            group_id,
            lesson_date,
            start_datetime,
            end_datetime,
            created_by: actor_id,
        };
        self.store
            .insert_lesson_if_absent(lesson, self.clock.now())
            .await?
            .ok_or_else(|| CourseDeskError::Conflict(format!("Group {} already has a lesson on {}", group_id, lesson_date)))
    }

    async fn load_group(&self, group_id: i64) -> Result<Group> {
        match self.store.find_group(group_id).await? {
            Some(group) if !group.is_deleted => Ok(group),
            _ => Err(CourseDeskError::group_not_found(group_id)),
        }
    }

    async fn generate(&self, group: &Group, window: GenerationWindow, actor_id: i64) -> Result<GenerationSummary> {
        let tz = parse_timezone(&group.timezone)?;
        let today = self.clock.today_in(tz);
        let dates = occurrences(group, window, self.limits, today)?;

        // Compute every instant before the first insert so a bad rule writes nothing
        let lessons = dates
            .into_iter()
            .map(|lesson_date| {
                let (start_datetime, end_datetime) =
                    lesson_bounds(lesson_date, group.start_time, group.duration_minutes, tz)?;
                Ok(NewLesson {
                    group_id: group.id,
                    lesson_date,
                    start_datetime,
                    end_datetime,
                    created_by: actor_id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut summary = GenerationSummary::default();
        for lesson in lessons {
            let lesson_date = lesson.lesson_date;
            match self.store.insert_lesson_if_absent(lesson, self.clock.now()).await? {
                Some(_) => summary.generated += 1,
                None => {
                    debug!(group_id = group.id, lesson_date = %lesson_date, "Lesson already exists, skipping");
                    summary.skipped += 1;
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn group(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Group {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Group {
            id: 1,
            name: "Salsa A".to_string(),
            teacher_id: 1,
            weekly_day: 5,
            start_time: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
            duration_minutes: 90,
            timezone: "UTC".to_string(),
            start_date,
            end_date,
            status: "active".to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_weeks_window_from_start_date() {
        let dates = occurrences(&group(d(2024, 1, 12), None), GenerationWindow::Weeks(8), GenerationLimits::default(), d(2024, 1, 10)).unwrap();
        assert_eq!(dates.len(), 8);
        assert_eq!(dates[0], d(2024, 1, 12));
        assert_eq!(dates[7], d(2024, 3, 1));
    }

    #[test]
    fn test_weeks_window_from_today() {
        let dates = occurrences(&group(d(2023, 9, 1), None), GenerationWindow::Weeks(2), GenerationLimits::default(), d(2024, 1, 13)).unwrap();
        assert_eq!(dates, vec![d(2024, 1, 19), d(2024, 1, 26)]);
    }

    #[test]
    fn test_end_date_truncates() {
        let dates = occurrences(&group(d(2024, 1, 12), Some(d(2024, 1, 26))), GenerationWindow::Weeks(8), GenerationLimits::default(), d(2024, 1, 1)).unwrap();
        assert_eq!(dates, vec![d(2024, 1, 12), d(2024, 1, 19), d(2024, 1, 26)]);
    }

    #[test]
    fn test_end_date_before_window_is_empty() {
        let dates = occurrences(&group(d(2023, 9, 1), Some(d(2023, 12, 1))), GenerationWindow::Weeks(8), GenerationLimits::default(), d(2024, 1, 10)).unwrap();
        assert!(dates.is_empty());
    }

    #[test]
    fn test_months_window_covers_current_month() {
        let dates = occurrences(&group(d(2023, 9, 1), None), GenerationWindow::Months(1), GenerationLimits::default(), d(2024, 1, 20)).unwrap();
        assert_eq!(dates.first(), Some(&d(2024, 1, 5)));
        assert_eq!(dates.last(), Some(&d(2024, 2, 23)));
        assert_eq!(dates.len(), 8);
    }

    #[test]
    fn test_invalid_rule() {
        let mut bad = group(d(2024, 1, 12), None);
        bad.weekly_day = 0;
        assert!(occurrences(&bad, GenerationWindow::Weeks(8), GenerationLimits::default(), d(2024, 1, 1)).is_err());
        assert!(occurrences(&group(d(2024, 1, 12), None), GenerationWindow::Weeks(0), GenerationLimits::default(), d(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_window_limits() {
        let limits = GenerationLimits { max_weeks: 10, max_months: 3 };
        let friday = group(d(2024, 1, 12), None);
        assert_eq!(occurrences(&friday, GenerationWindow::Weeks(10), limits, d(2024, 1, 1)).unwrap().len(), 10);
        assert!(matches!(
            occurrences(&friday, GenerationWindow::Weeks(11), limits, d(2024, 1, 1)),
            Err(CourseDeskError::Validation(_))
        ));
        assert!(occurrences(&friday, GenerationWindow::Months(3), limits, d(2024, 1, 1)).is_ok());
        assert!(matches!(
            occurrences(&friday, GenerationWindow::Months(4), limits, d(2024, 1, 1)),
            Err(CourseDeskError::Validation(_))
        ));
    }

    #[test]
    fn test_huge_window_fails_without_panicking() {
        let unbounded = GenerationLimits { max_weeks: u32::MAX, max_months: u32::MAX };
        let friday = group(d(2024, 1, 12), None);
        for window in [
            GenerationWindow::Weeks(u32::MAX),
            GenerationWindow::Months(u32::MAX),
            GenerationWindow::Months(i32::MAX as u32),
        ] {
            assert!(matches!(
                occurrences(&friday, window, unbounded, d(2024, 1, 1)),
                Err(CourseDeskError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_totals() {
        let result = |generated, skipped| GenerationResult {
            group_id: 1,
            group_name: String::new(),
            generated,
            skipped,
            error: None,
        };
        assert_eq!(totals(&[result(3, 1), result(0, 4)]), GenerationSummary { generated: 3, skipped: 5 });
    }
}
