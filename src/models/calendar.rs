use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Color marker used for "available" events (green in the Google palette)
pub const AVAILABLE_COLOR_ID: &str = "10";

// An event as it exists in the external calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub color_id: Option<String>,
}

// Event content sent on create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub color_id: Option<String>,
}

impl EventDraft {
    pub fn into_event(self, id: String) -> CalendarEvent {
        CalendarEvent {
            id,
            title: self.title,
            description: self.description,
            start: self.start,
            end: self.end,
            color_id: self.color_id,
        }
    }
}

/// Counts of the mutations one reconciliation pass performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}
