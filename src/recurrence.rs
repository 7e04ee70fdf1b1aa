//! Expansion of recurrence rules into concrete occurrence dates.
//
// Monthly and yearly stepping use calendar arithmetic, not fixed day counts:
// the day-of-month is clamped to the target month's last valid day, and each
// step is computed from the running date rather than the original start, so a
// rule starting on the 31st drifts to the 30th (or 28th/29th) and stays there.

use chrono::{Datelike, Duration, NaiveDate};
use log::debug;

use crate::models::{Event, EventDraft, Frequency, RecurrenceRule};

/// Hard cap on generated occurrences, counted as steps of the expansion
/// loop. Expansion has no cancellation mechanism, so a pathological rule
/// (tiny interval, far horizon) is bounded here instead.
pub const MAX_OCCURRENCES: usize = 1000;

/// Expand a recurrence rule into the ordered dates of its occurrences.
///
/// The start date itself is never emitted; it belongs to the original event.
/// A rule with `is_recurring` unset, or set without a frequency, expands to
/// nothing. Without an explicit end date the horizon is two calendar years
/// past the start.
pub fn expand(start: NaiveDate, rule: &RecurrenceRule) -> Vec<NaiveDate> {
    if !rule.is_recurring {
        return Vec::new();
    }
    let Some(frequency) = rule.frequency else {
        debug!("Recurring rule without a frequency expands to no occurrences");
        return Vec::new();
    };
    let interval = rule.interval.unwrap_or(1).max(1);
    let max_date = rule.end_date.unwrap_or_else(|| add_months(start, 24));

    let mut occurrences = Vec::new();
    let mut current = start;
    for _ in 0..MAX_OCCURRENCES {
        current = advance(current, frequency, interval);
        if current > max_date {
            break;
        }
        if current > start {
            occurrences.push(current);
        }
    }
    debug!(
        "Expanded {:?} rule starting {} into {} occurrences",
        frequency,
        start,
        occurrences.len()
    );
    occurrences
}

/// Build the child records for a parent event's occurrence dates.
///
/// Children copy the parent's content, take the occurrence date, and carry no
/// rule fields of their own; recurrence is single-level. Persisting the
/// records (and assigning their ids) is the store's job.
pub fn materialize(parent: &Event, dates: &[NaiveDate]) -> Vec<EventDraft> {
    dates
        .iter()
        .map(|&date| EventDraft {
            title: parent.title.clone(),
            description: parent.description.clone(),
            date,
            time: parent.time.clone(),
            organizer: parent.organizer.clone(),
            location_type: parent.location_type,
            location_name: parent.location_name.clone(),
            location_address: parent.location_address.clone(),
            meeting_url: parent.meeting_url.clone(),
            max_attendees: parent.max_attendees,
            is_recurring: false,
            frequency: None,
            interval: None,
            recurrence_end_date: None,
        })
        .collect()
}

fn advance(date: NaiveDate, frequency: Frequency, interval: u32) -> NaiveDate {
    match frequency {
        Frequency::Daily => date + Duration::days(i64::from(interval)),
        Frequency::Weekly => date + Duration::days(i64::from(interval) * 7),
        Frequency::Monthly => add_months(date, interval),
        Frequency::Yearly => add_months(date, interval * 12),
    }
}

/// Add calendar months, clamping the day to the target month's last day.
/// Year addition goes through here too (Feb 29 clamps to Feb 28).
fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("clamped day always falls inside the target month")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}
