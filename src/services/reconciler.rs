use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::client::CalendarApi;
use crate::error::CalendarError;
use crate::models::calendar::{CalendarEvent, EventDraft, ReconcileReport, AVAILABLE_COLOR_ID};
use crate::models::slot::{parse_slot_date, DaySlotStatus, Snapshot};
use crate::services::last_slot::minutes_since_midnight;

/// Combine a calendar display date and a 12-hour slot time into an instant,
/// interpreting both in `tz`. Nonexistent local times (DST gaps) yield `None`.
pub fn slot_start(date: &str, time: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let day = parse_slot_date(date)?;
    let minutes = minutes_since_midnight(time)?;
    let clock = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)?;
    let local = tz.from_local_datetime(&day.and_time(clock)).earliest()?;
    Some(local.with_timezone(&Utc))
}

/// Mirrors a snapshot onto an external calendar.
///
/// Events are owned by this reconciler when their title starts with the
/// configured prefix; all other events are left alone. An owned event matches
/// a snapshot entry when both title and start instant are equal.
pub struct CalendarReconciler<'a> {
    api: &'a dyn CalendarApi,
    calendar_id: &'a str,
    title_prefix: &'a str,
    time_zone: Tz,
    booking_url: &'a str,
}

impl<'a> CalendarReconciler<'a> {
    pub fn new(
        api: &'a dyn CalendarApi,
        calendar_id: &'a str,
        title_prefix: &'a str,
        time_zone: Tz,
        booking_url: &'a str,
    ) -> Self {
        Self {
            api,
            calendar_id,
            title_prefix,
            time_zone,
            booking_url,
        }
    }

    pub fn event_title(&self, equipment: &str) -> String {
        format!("{}: {} available", self.title_prefix, equipment)
    }

    fn is_owned(&self, event: &CalendarEvent) -> bool {
        event.title.starts_with(&format!("{}: ", self.title_prefix))
    }

    fn description(&self, slot: &DaySlotStatus) -> String {
        format!(
            "The last slot of the day ({} on {}) is open for {}.\nBook at: {}",
            slot.last_time, slot.date, slot.equipment, self.booking_url
        )
    }

    /// Draft for a snapshot entry, or `None` when its date/time cannot be placed in time.
    pub fn draft_for(&self, slot: &DaySlotStatus) -> Option<EventDraft> {
        let start = slot_start(&slot.date, &slot.last_time, self.time_zone)?;
        Some(EventDraft {
            title: self.event_title(&slot.equipment),
            description: self.description(slot),
            start,
            end: start + Duration::hours(1),
            color_id: Some(AVAILABLE_COLOR_ID.to_string()),
        })
    }

    /// Make the owned events equal to the snapshot entries.
    ///
    /// Only a failure to list existing events is returned as an error; single
    /// create/update/delete failures are logged and counted in the report.
    pub async fn reconcile(&self, snapshot: &Snapshot) -> Result<ReconcileReport, CalendarError> {
        let mut drafts = Vec::with_capacity(snapshot.len());
        for slot in &snapshot.slots {
            match self.draft_for(slot) {
                Some(draft) => drafts.push(draft),
                None => warn!(
                    "Cannot place {} at {} on '{}' in time - skipping calendar event",
                    slot.equipment, slot.last_time, slot.date
                ),
            }
        }

        // Reach back to the earliest entry so events that already ended still match
        let now = Utc::now();
        let time_min = drafts.iter().map(|d| d.start).min().map_or(now, |s| s.min(now));
        let existing = self.api.list_events(self.calendar_id, time_min).await?;

        let mut by_key: HashMap<(String, DateTime<Utc>), Vec<CalendarEvent>> = HashMap::new();
        for event in existing.into_iter().filter(|e| self.is_owned(e)) {
            by_key
                .entry((event.title.clone(), event.start))
                .or_default()
                .push(event);
        }

        let mut report = ReconcileReport::default();

        for draft in drafts {
            let matched = by_key
                .get_mut(&(draft.title.clone(), draft.start))
                .and_then(|events| (!events.is_empty()).then(|| events.remove(0)));

            match matched {
                Some(event) if event.description == draft.description => {
                    report.unchanged += 1;
                }
                Some(event) => {
                    match self.api.update_event(self.calendar_id, &event.id, &draft).await {
                        Ok(()) => {
                            info!("Updated calendar event '{}' ({})", draft.title, event.id);
                            report.updated += 1;
                        }
                        Err(e) => {
                            error!("Failed to update calendar event {}: {}", event.id, e);
                            report.failed += 1;
                        }
                    }
                }
                None => match self.api.create_event(self.calendar_id, &draft).await {
                    Ok(created) => {
                        info!(
                            "Created calendar event '{}' at {} ({})",
                            draft.title, draft.start, created.id
                        );
                        report.created += 1;
                    }
                    Err(e) => {
                        error!("Failed to create calendar event '{}': {}", draft.title, e);
                        report.failed += 1;
                    }
                },
            }
        }

        // Whatever is left has no snapshot entry, including duplicates
        for event in by_key.into_values().flatten() {
            match self.api.delete_event(self.calendar_id, &event.id).await {
                Ok(()) => {
                    info!("Deleted calendar event '{}' ({})", event.title, event.id);
                    report.deleted += 1;
                }
                Err(e) => {
                    error!("Failed to delete calendar event {}: {}", event.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Calendar reconciled: {} created, {} updated, {} deleted, {} unchanged, {} failed",
            report.created, report.updated, report.deleted, report.unchanged, report.failed
        );
        Ok(report)
    }
}
