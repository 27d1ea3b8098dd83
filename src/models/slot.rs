use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// Display form used by the reservation calendar, e.g. "Tuesday, January 13, 2026"
pub const SLOT_DATE_FORMAT: &str = "%A, %B %d, %Y";

/// One raw calendar cell as extracted by the render collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotElement {
    pub label: String,
    #[serde(default, rename = "classNames")]
    pub class_names: String,
}

impl SlotElement {
    pub fn new(label: &str, class_names: &str) -> Self {
        Self {
            label: label.to_string(),
            class_names: class_names.to_string(),
        }
    }
}

// One observed calendar cell after parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub equipment: String,
    pub date: String,
    pub time: String,
    pub available: bool,
}

impl SlotRecord {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(&self.equipment, &self.date)
    }
}

/// Status of the last bookable slot for one equipment item on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlotStatus {
    pub equipment: String,
    pub date: String,
    pub last_time: String,
    pub last_available: bool,
}

impl DaySlotStatus {
    pub fn key(&self) -> SlotKey {
        SlotKey::new(&self.equipment, &self.date)
    }
}

/// Identity of a (equipment, date) pair. The slot time is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub equipment: String,
    pub date: String,
}

impl SlotKey {
    pub fn new(equipment: &str, date: &str) -> Self {
        Self {
            equipment: equipment.to_string(),
            date: date.to_string(),
        }
    }
}

/// Parse a calendar display date into a calendar day.
pub fn parse_slot_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), SLOT_DATE_FORMAT).ok()
}

// Dates that cannot be parsed sort after every real date, then by text
fn compare_dates(a: &str, b: &str) -> Ordering {
    let by_day = match (parse_slot_date(a), parse_slot_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_day.then_with(|| a.cmp(b))
}

/// The full result of one scan: every (equipment, date) whose last slot is open.
///
/// Built once per run and never mutated afterwards. Entries are unique per
/// pair and sorted by date ascending, then equipment name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub slots: Vec<DaySlotStatus>,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from reduced day statuses, keeping only open last slots.
    pub fn from_statuses(statuses: Vec<DaySlotStatus>, captured_at: DateTime<Utc>) -> Self {
        let mut slots: Vec<DaySlotStatus> = Vec::new();

        for status in statuses.into_iter().filter(|s| s.last_available) {
            // Later statuses for the same pair replace earlier ones
            match slots.iter_mut().find(|s| s.key() == status.key()) {
                Some(existing) => *existing = status,
                None => slots.push(status),
            }
        }

        slots.sort_by(|a, b| {
            compare_dates(&a.date, &b.date).then_with(|| a.equipment.cmp(&b.equipment))
        });

        Self { slots, captured_at }
    }

    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            captured_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.slots.iter().map(DaySlotStatus::key)
    }
}

/// Difference between two snapshots, keyed by (equipment, date).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub added: Vec<SlotKey>,
    pub removed: Vec<SlotKey>,
}

impl Delta {
    pub fn has_additions(&self) -> bool {
        !self.added.is_empty()
    }
}

// On-disk state document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub slots: Vec<SlotRecord>,
    #[serde(rename = "lastChecked")]
    pub last_checked: DateTime<Utc>,
}

impl From<&Snapshot> for PersistedState {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            slots: snapshot
                .slots
                .iter()
                .map(|s| SlotRecord {
                    equipment: s.equipment.clone(),
                    date: s.date.clone(),
                    time: s.last_time.clone(),
                    available: s.last_available,
                })
                .collect(),
            last_checked: snapshot.captured_at,
        }
    }
}

impl From<PersistedState> for Snapshot {
    fn from(state: PersistedState) -> Self {
        let statuses = state
            .slots
            .into_iter()
            .map(|r| DaySlotStatus {
                equipment: r.equipment,
                date: r.date,
                last_time: r.time,
                last_available: r.available,
            })
            .collect();

        Snapshot::from_statuses(statuses, state.last_checked)
    }
}

// Entry of the older state format: a bare array of open last slots
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyStateEntry {
    pub equipment: String,
    pub date: String,
    #[serde(default, rename = "dateTime")]
    pub date_time: String,
}

impl LegacyStateEntry {
    // "7:00pm Tuesday, January 13, 2026" -> "7:00pm"
    fn time(&self) -> String {
        let date_time = self.date_time.trim();
        match date_time.strip_suffix(self.date.trim()) {
            Some(prefix) => prefix.trim().trim_end_matches('-').trim().to_string(),
            None => date_time
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredState {
    Current(PersistedState),
    Legacy(Vec<LegacyStateEntry>),
}

impl StoredState {
    /// Convert the stored document into a snapshot. Legacy documents carry no
    /// timestamp, so `fallback_time` stands in for it.
    pub fn into_snapshot(self, fallback_time: DateTime<Utc>) -> Snapshot {
        match self {
            StoredState::Current(state) => state.into(),
            StoredState::Legacy(entries) => {
                let statuses = entries
                    .iter()
                    .map(|entry| DaySlotStatus {
                        equipment: entry.equipment.clone(),
                        date: entry.date.clone(),
                        last_time: entry.time(),
                        last_available: true,
                    })
                    .collect();
                Snapshot::from_statuses(statuses, fallback_time)
            }
        }
    }
}
