use tracing::debug;

use crate::models::slot::{SlotElement, SlotRecord};
use crate::services::last_slot::minutes_since_midnight;

const LABEL_SEPARATOR: &str = " - ";

// Class tokens that mark a cell as not bookable, checked before the available ones
const RESERVED_CLASS_MARKERS: [&str; 3] = ["reserved", "unavailable", "disabled"];
const AVAILABLE_CLASS_MARKERS: [&str; 1] = ["available"];

/// Turns raw calendar cells into slot records for the watched equipment.
///
/// Labels are expected to look like
/// `7:00pm - Tuesday, January 13, 2026 - Laser Cutter - Available`
/// (the separator between time and date may also be a plain space). The
/// textual status token decides availability; class names are consulted only
/// when the label carries no status token.
#[derive(Debug, Clone)]
pub struct SlotParser {
    watch_list: Vec<String>,
}

impl SlotParser {
    pub fn new(watch_list: &[String]) -> Self {
        Self {
            watch_list: watch_list.iter().map(|n| n.trim().to_string()).collect(),
        }
    }

    /// Exact match after trimming; "Laser Cutters" is not "Laser Cutter".
    pub fn is_watched(&self, equipment: &str) -> bool {
        let equipment = equipment.trim();
        self.watch_list.iter().any(|name| name == equipment)
    }

    pub fn parse(&self, elements: &[SlotElement]) -> Vec<SlotRecord> {
        let records: Vec<SlotRecord> = elements
            .iter()
            .filter_map(|element| self.parse_element(element))
            .collect();

        debug!(
            "Parsed {} watched slots out of {} elements",
            records.len(),
            elements.len()
        );
        records
    }

    pub fn parse_element(&self, element: &SlotElement) -> Option<SlotRecord> {
        let parts: Vec<&str> = element.label.split(LABEL_SEPARATOR).map(str::trim).collect();
        let (last, rest) = parts.split_last()?;

        let (available, body) = match status_from_token(last) {
            Some(available) => (available, rest),
            None => (status_from_classes(&element.class_names)?, parts.as_slice()),
        };

        // Equipment names may themselves contain " - ", so try every split point
        (1..body.len()).find_map(|split| {
            let equipment = body[split..].join(LABEL_SEPARATOR);
            if !self.is_watched(&equipment) {
                return None;
            }
            let (time, date) = split_time_and_date(&body[..split].join(LABEL_SEPARATOR))?;

            Some(SlotRecord {
                equipment: equipment.trim().to_string(),
                date,
                time,
                available,
            })
        })
    }
}

fn status_from_token(token: &str) -> Option<bool> {
    if token.eq_ignore_ascii_case("available") {
        Some(true)
    } else if token.eq_ignore_ascii_case("reserved") {
        Some(false)
    } else {
        None
    }
}

/// Availability derived from a cell's class list, or `None` when the classes
/// carry no signal either way.
pub fn status_from_classes(class_names: &str) -> Option<bool> {
    let classes: Vec<String> = class_names
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();

    let has_marker = |marker: &str| {
        classes
            .iter()
            .any(|c| c == marker || c.ends_with(&format!("-{}", marker)))
    };

    if RESERVED_CLASS_MARKERS.iter().any(|m| has_marker(m)) {
        Some(false)
    } else if AVAILABLE_CLASS_MARKERS.iter().any(|m| has_marker(m)) {
        Some(true)
    } else {
        None
    }
}

// "7:00pm Tuesday, January 13, 2026", "7:00 pm - Tuesday, ..." -> ("7:00pm", "Tuesday, ...")
fn split_time_and_date(date_time: &str) -> Option<(String, String)> {
    let mut tokens = date_time.split_whitespace().peekable();
    let mut time = tokens.next()?.to_string();

    if let Some(next) = tokens.peek() {
        if next.eq_ignore_ascii_case("am") || next.eq_ignore_ascii_case("pm") {
            time.push_str(&next.to_ascii_lowercase());
            tokens.next();
        }
    }

    minutes_since_midnight(&time)?;

    let date = tokens
        .skip_while(|t| *t == "-")
        .collect::<Vec<_>>()
        .join(" ");
    if date.is_empty() {
        return None;
    }

    Some((time, date))
}
