//! ICS export of stored events.
//
// This is a deliberately simplified rendition of the interchange format: no
// character escaping, no 75-octet line folding, and every timestamp is
// stamped as UTC straight from the naive local value. Events are written in
// the order supplied; callers pass them pre-sorted by date then time.

use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use log::debug;
use thiserror::Error;

use crate::models::{Event, LocationType};

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const PRODID: &str = "-//Community Calendar//commcal//EN";

/// Fixed event duration used for DTEND; the format carries no other notion
/// of how long an event lasts.
const EVENT_DURATION_HOURS: i64 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("No events to export")]
    EmptyExportSet,
}

/// Serialize events into an ICS document.
///
/// `now` is the generation timestamp written to every DTSTAMP line; it is
/// injected rather than read from the clock so output is reproducible.
pub fn serialize(events: &[Event], now: DateTime<Utc>) -> Result<String, ExportError> {
    if events.is_empty() {
        return Err(ExportError::EmptyExportSet);
    }

    let mut lines: Vec<String> = Vec::new();
    lines.push("BEGIN:VCALENDAR".to_string());
    lines.push("VERSION:2.0".to_string());
    lines.push(format!("PRODID:{}", PRODID));
    for event in events {
        write_event(&mut lines, event, now);
    }
    lines.push("END:VCALENDAR".to_string());

    debug!("Serialized {} events into calendar document", events.len());
    Ok(lines.join("\r\n") + "\r\n")
}

fn write_event(lines: &mut Vec<String>, event: &Event, now: DateTime<Utc>) {
    let start = event_start(event);
    let end = start + Duration::hours(EVENT_DURATION_HOURS);

    lines.push("BEGIN:VEVENT".to_string());
    lines.push(format!("UID:event-{}@community-calendar", event.id));
    lines.push(format!("DTSTAMP:{}", now.format(TIMESTAMP_FORMAT)));
    lines.push(format!("DTSTART:{}", start.format(TIMESTAMP_FORMAT)));
    lines.push(format!("DTEND:{}", end.format(TIMESTAMP_FORMAT)));
    lines.push(format!("SUMMARY:{}", event.title));

    if let Some(description) = non_empty(&event.description) {
        lines.push(format!("DESCRIPTION:{}", description));
    }
    if let Some(organizer) = non_empty(&event.organizer) {
        lines.push(format!("ORGANIZER:{}", organizer));
    }
    if let Some(location) = location_line(event) {
        lines.push(format!("LOCATION:{}", location));
    }
    if let Some(rule) = rrule(event) {
        lines.push(format!("RRULE:{}", rule));
    }
    lines.push("END:VEVENT".to_string());
}

/// Event date combined with its HH:MM time, or midnight when no time is set.
fn event_start(event: &Event) -> NaiveDateTime {
    let time = event
        .time
        .as_deref()
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default());
    event.date.and_time(time)
}

/// Human-readable location line, or `None` when the event has no usable
/// location parts. Parts are joined with ", ".
fn location_line(event: &Event) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    match event.location_type {
        Some(LocationType::Online) => {
            if let Some(url) = non_empty(&event.meeting_url) {
                parts.push(format!("Online: {}", url));
            }
        }
        Some(LocationType::InPerson) => {
            if let Some(name) = non_empty(&event.location_name) {
                parts.push(name.to_string());
            }
            if let Some(address) = non_empty(&event.location_address) {
                parts.push(address.to_string());
            }
        }
        Some(LocationType::Hybrid) => {
            if let Some(name) = non_empty(&event.location_name) {
                parts.push(name.to_string());
            }
            if let Some(address) = non_empty(&event.location_address) {
                parts.push(address.to_string());
            }
            if let Some(url) = non_empty(&event.meeting_url) {
                parts.push(format!("Online option: {}", url));
            }
        }
        None => {}
    }
    if parts.is_empty() { None } else { Some(parts.join(", ")) }
}

/// Declarative rule text for a row that still carries its recurrence fields.
///
/// This looks only at the row itself: a parent advertises its rule even
/// though its occurrences are also stored as flat child rows, and a child
/// (which never carries the fields) gets nothing. The two representations
/// are intentionally kept independent.
fn rrule(event: &Event) -> Option<String> {
    if !event.is_recurring {
        return None;
    }
    let frequency = event.frequency?;
    let mut rule =
        format!("FREQ={};INTERVAL={}", frequency.ical_name(), event.interval.unwrap_or(1));
    if let Some(end) = event.recurrence_end_date {
        rule.push_str(&format!(";UNTIL={}T000000Z", end.format("%Y%m%d")));
    }
    Some(rule)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    fn bare_event(id: i64, title: &str, date: NaiveDate) -> Event {
        Event {
            id,
            title: title.to_string(),
            description: None,
            date,
            time: None,
            organizer: None,
            location_type: None,
            location_name: None,
            location_address: None,
            meeting_url: None,
            max_attendees: None,
            is_recurring: false,
            frequency: None,
            interval: None,
            recurrence_end_date: None,
            parent_event_id: None,
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_input_is_an_error_not_an_empty_document() {
        assert_eq!(serialize(&[], fixed_now()), Err(ExportError::EmptyExportSet));
    }

    #[test]
    fn minimal_event_block_has_exactly_the_required_lines() {
        let event = bare_event(3, "Street Cleanup", date(2024, 7, 15));
        let doc = serialize(&[event], fixed_now()).unwrap();
        let lines: Vec<&str> = doc.lines().collect();

        assert_eq!(lines, vec![
            "BEGIN:VCALENDAR",
            "VERSION:2.0",
            "PRODID:-//Community Calendar//commcal//EN",
            "BEGIN:VEVENT",
            "UID:event-3@community-calendar",
            "DTSTAMP:20240601T093000Z",
            "DTSTART:20240715T000000Z",
            "DTEND:20240715T010000Z",
            "SUMMARY:Street Cleanup",
            "END:VEVENT",
            "END:VCALENDAR",
        ]);
    }

    #[test]
    fn event_time_drives_dtstart_and_the_one_hour_dtend() {
        let mut event = bare_event(1, "Yoga", date(2024, 3, 5));
        event.time = Some("18:30".to_string());
        let doc = serialize(&[event], fixed_now()).unwrap();

        assert!(doc.contains("DTSTART:20240305T183000Z\r\n"));
        assert!(doc.contains("DTEND:20240305T193000Z\r\n"));
    }

    #[test]
    fn weekly_rule_with_end_date_renders_the_full_rrule() {
        let mut event = bare_event(9, "Book Club", date(2024, 1, 10));
        event.is_recurring = true;
        event.frequency = Some(crate::models::Frequency::Weekly);
        event.interval = Some(2);
        event.recurrence_end_date = Some(date(2024, 12, 31));

        let doc = serialize(&[event], fixed_now()).unwrap();
        assert!(doc.contains("RRULE:FREQ=WEEKLY;INTERVAL=2;UNTIL=20241231T000000Z\r\n"));
    }

    #[test]
    fn rule_without_end_date_omits_until() {
        let mut event = bare_event(9, "Book Club", date(2024, 1, 10));
        event.is_recurring = true;
        event.frequency = Some(crate::models::Frequency::Monthly);
        event.interval = None;

        let doc = serialize(&[event], fixed_now()).unwrap();
        assert!(doc.contains("RRULE:FREQ=MONTHLY;INTERVAL=1\r\n"));
        assert!(!doc.contains("UNTIL"));
    }

    #[test]
    fn recurring_flag_without_frequency_emits_no_rrule() {
        let mut event = bare_event(4, "Odd Row", date(2024, 1, 10));
        event.is_recurring = true;
        let doc = serialize(&[event], fixed_now()).unwrap();
        assert!(!doc.contains("RRULE"));
    }

    #[test]
    fn online_location_is_just_the_prefixed_url() {
        let mut event = bare_event(5, "Webinar", date(2024, 2, 1));
        event.location_type = Some(LocationType::Online);
        event.meeting_url = Some("https://meet.example/abc".to_string());

        let doc = serialize(&[event], fixed_now()).unwrap();
        assert!(doc.contains("LOCATION:Online: https://meet.example/abc\r\n"));
    }

    #[test]
    fn hybrid_location_joins_name_address_and_online_option() {
        let mut event = bare_event(6, "Town Hall", date(2024, 2, 1));
        event.location_type = Some(LocationType::Hybrid);
        event.location_name = Some("Civic Hall".to_string());
        event.location_address = Some("12 Main St".to_string());
        event.meeting_url = Some("https://meet.example/town".to_string());

        let doc = serialize(&[event], fixed_now()).unwrap();
        assert!(doc.contains(
            "LOCATION:Civic Hall, 12 Main St, Online option: https://meet.example/town\r\n"
        ));
    }

    #[test]
    fn in_person_location_with_no_parts_is_omitted() {
        let mut event = bare_event(7, "Mystery Meetup", date(2024, 2, 1));
        event.location_type = Some(LocationType::InPerson);
        let doc = serialize(&[event], fixed_now()).unwrap();
        assert!(!doc.contains("LOCATION"));
    }

    #[test]
    fn description_and_organizer_are_conditional_and_unescaped() {
        let mut event = bare_event(8, "Picnic; with, semicolons", date(2024, 2, 1));
        event.description = Some("Line one, still line one".to_string());
        event.organizer = Some("Parks Dept".to_string());

        let doc = serialize(&[event], fixed_now()).unwrap();
        // Verbatim output: the simplified format does not escape text fields.
        assert!(doc.contains("SUMMARY:Picnic; with, semicolons\r\n"));
        assert!(doc.contains("DESCRIPTION:Line one, still line one\r\n"));
        assert!(doc.contains("ORGANIZER:Parks Dept\r\n"));
    }

    #[test]
    fn events_are_written_in_input_order() {
        let first = bare_event(1, "First", date(2024, 5, 1));
        let second = bare_event(2, "Second", date(2024, 4, 1));
        let doc = serialize(&[first, second], fixed_now()).unwrap();

        let first_pos = doc.find("SUMMARY:First").unwrap();
        let second_pos = doc.find("SUMMARY:Second").unwrap();
        assert!(first_pos < second_pos);
    }
}
