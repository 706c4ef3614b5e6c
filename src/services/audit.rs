//! Append-only change log for lessons
//!
//! Lesson and attendance mutations hand their entries to the store together with the
//! write itself; [`ChangeAudit::record`] appends a standalone entry.

use std::sync::Arc;
use tracing::debug;
use crate::database::ScheduleStore;
use crate::models::{Actor, AuditStamp, Channel, ChangeLogEntry, FieldChange, NewChangeLogEntry};
use crate::utils::clock::Clock;
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct ChangeAudit {
    store: Arc<dyn ScheduleStore>,
    clock: Arc<dyn Clock>,
}

impl ChangeAudit {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Provenance for every entry of one mutation. The actor must carry a display name.
    pub fn stamp(actor: &Actor, channel: Channel) -> Result<AuditStamp> {
        actor.validate()?;
        Ok(AuditStamp {
            changed_by: actor.user_id,
            changed_by_name: actor.display_name.clone(),
            changed_by_external_id: actor.external_id.clone(),
            changed_via: channel.as_str().to_string(),
        })
    }

    /// One entry per changed field
    pub fn entries(lesson_id: i64, changes: &[FieldChange], stamp: &AuditStamp) -> Vec<NewChangeLogEntry> {
        changes
            .iter()
            .map(|change| stamp.entry(lesson_id, change.field_name, change.old_value.clone(), change.new_value.clone()))
            .collect()
    }

    /// Append one field-level change
    pub async fn record(
        &self,
        lesson_id: i64,
        field_name: &str,
        old_value: Option<&str>,
        new_value: Option<&str>,
        actor: &Actor,
        channel: Channel,
    ) -> Result<ChangeLogEntry> {
        let entry = Self::stamp(actor, channel)?.entry(
            lesson_id,
            field_name,
            old_value.map(str::to_string),
            new_value.map(str::to_string),
        );

        debug!(lesson_id = lesson_id, field = field_name, via = channel.as_str(), "Recording lesson change");
        self.store.append_change_log(entry, self.clock.now()).await
    }

    /// Entries for a lesson in insertion order
    pub async fn history(&self, lesson_id: i64) -> Result<Vec<ChangeLogEntry>> {
        self.store.list_change_logs(lesson_id).await
    }
}
