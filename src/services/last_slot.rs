use std::collections::HashMap;
use tracing::debug;

use crate::models::slot::{DaySlotStatus, SlotKey, SlotRecord};

/// Convert a 12-hour clock label ("7:00pm", "7:00 PM", "7pm") into minutes
/// since midnight. Returns `None` for anything that is not a valid time.
pub fn minutes_since_midnight(time: &str) -> Option<u32> {
    let compact: String = time
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();

    let (clock, is_pm) = if let Some(clock) = compact.strip_suffix("pm") {
        (clock, true)
    } else if let Some(clock) = compact.strip_suffix("am") {
        (clock, false)
    } else {
        return None;
    };

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) if m.len() == 2 => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        Some(_) => return None,
        None => (clock.parse::<u32>().ok()?, 0),
    };

    if !(1..=12).contains(&hour) || minute >= 60 {
        return None;
    }

    // 12am is midnight, 12pm stays noon
    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };

    Some(hour * 60 + minute)
}

/// Reduce slot records to one status per (equipment, date): the status of the
/// latest slot of that day. Earlier slots never influence the result.
///
/// Records with an unparseable time stay in their group but never win the
/// comparison; a group made only of such records produces no status. Equal
/// times resolve to the record seen last. Output follows first-seen order.
pub fn reduce_last_slots(records: &[SlotRecord]) -> Vec<DaySlotStatus> {
    let mut order: Vec<SlotKey> = Vec::new();
    let mut latest: HashMap<SlotKey, Option<(u32, &SlotRecord)>> = HashMap::new();

    for record in records {
        let key = record.key();
        let entry = latest.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            None
        });

        let Some(minutes) = minutes_since_midnight(&record.time) else {
            debug!(
                "Ignoring unparseable slot time '{}' for {} on {}",
                record.time, record.equipment, record.date
            );
            continue;
        };

        let replace = match entry {
            Some((best, _)) => minutes >= *best,
            None => true,
        };
        if replace {
            *entry = Some((minutes, record));
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            let (_, record) = latest.remove(&key).flatten()?;
            Some(DaySlotStatus {
                equipment: record.equipment.clone(),
                date: record.date.clone(),
                last_time: record.time.clone(),
                last_available: record.available,
            })
        })
        .collect()
}
