use chrono::NaiveDate;

use crate::models::slot::{parse_slot_date, SlotKey, Snapshot};

const REPORT_TITLE: &str = "MAKERSPACE AVAILABILITY CHECK";

/// Human-readable distance between two local calendar days.
pub fn days_away(today: NaiveDate, date: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "TODAY".to_string(),
        1 => "tomorrow".to_string(),
        n if n < 0 => format!("{} days ago", -n),
        n => format!("{} days away", n),
    }
}

fn annotate(date: &str, today: NaiveDate) -> String {
    match parse_slot_date(date) {
        Some(day) => format!("{} ({})", date, days_away(today, day)),
        None => date.to_string(),
    }
}

// Group keys by date, keeping first-seen date order
fn group_by_date(keys: &[SlotKey]) -> Vec<(&str, Vec<&str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for key in keys {
        match groups.iter_mut().find(|(date, _)| *date == key.date) {
            Some((_, equipment)) => equipment.push(key.equipment.as_str()),
            None => groups.push((key.date.as_str(), vec![key.equipment.as_str()])),
        }
    }
    groups
}

pub fn notification_subject(added: &[SlotKey], first_run: bool) -> String {
    if first_run {
        format!("Makerspace availability: {} open last slots", added.len())
    } else {
        format!("Makerspace availability: {} NEW open last slots", added.len())
    }
}

/// Plain-text notification body listing each added pair with its "days away".
pub fn notification_body(
    added: &[SlotKey],
    first_run: bool,
    today: NaiveDate,
    booking_url: &str,
) -> String {
    if added.is_empty() {
        return format!(
            "{}\n{}\n\nNone available\n\nNo open last-of-day slots were found.\n\nCheck again later or visit: {}",
            REPORT_TITLE,
            "=".repeat(REPORT_TITLE.len()),
            booking_url
        );
    }

    let header = if first_run {
        "Currently Available"
    } else {
        "NEW Availability Detected!"
    };

    let dates = group_by_date(added)
        .into_iter()
        .map(|(date, equipment)| {
            format!(
                "  * {}:\n{}",
                annotate(date, today),
                equipment
                    .iter()
                    .map(|name| format!("    - {}", name))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n{}\n\n{}\n\n{}\n\nBook now at: {}",
        REPORT_TITLE,
        "=".repeat(REPORT_TITLE.len()),
        header,
        dates,
        booking_url
    )
}

/// Markdown run summary.
pub fn run_summary(
    current: &Snapshot,
    added: &[SlotKey],
    first_run: bool,
    booking_url: &str,
) -> String {
    let title = "# Makerspace Last-Slot Availability";
    let link = format!("[Visit Booking Page]({})", booking_url);

    if current.is_empty() {
        return format!(
            "{}\n\n## None Available\n\nNo open last-of-day slots found.\n\n{}\n",
            title, link
        );
    }

    if added.is_empty() {
        return format!(
            "{}\n\n## No Changes\n\nSame availability as last check ({} slots still available).\n\n{}\n",
            title,
            current.len(),
            link
        );
    }

    let header = if first_run {
        "Currently Available"
    } else {
        "NEW Availability Detected!"
    };

    let lines = group_by_date(added)
        .into_iter()
        .map(|(date, equipment)| {
            let mut block = format!("- **{}**", date);
            for name in equipment {
                block.push_str(&format!("\n  - {}", name));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n\n## {}\n\n{}\n\n{}\n", title, header, lines, link)
}
