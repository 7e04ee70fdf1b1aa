//! RSVP status aggregation and the capacity check built on it.

use serde::Serialize;

use crate::models::{Rsvp, RsvpStatus};

/// Per-status counts for one event's RSVPs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RsvpCounts {
    pub going: u32,
    pub maybe: u32,
    pub not_going: u32,
}

/// Count RSVPs by status.
pub fn aggregate(records: &[Rsvp]) -> RsvpCounts {
    let mut counts = RsvpCounts::default();
    for record in records {
        match record.status {
            RsvpStatus::Going => counts.going += 1,
            RsvpStatus::Maybe => counts.maybe += 1,
            RsvpStatus::NotGoing => counts.not_going += 1,
        }
    }
    counts
}

/// Whether one more "going" RSVP fits under the event's attendance cap.
/// Events without a cap always have room.
pub fn has_capacity(counts: RsvpCounts, max_attendees: Option<u32>) -> bool {
    match max_attendees {
        Some(cap) => counts.going < cap,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn rsvp(status: RsvpStatus) -> Rsvp {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Rsvp {
            id: 1,
            event_id: 1,
            attendee_name: "Alex".to_string(),
            attendee_email: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn aggregate_counts_each_status() {
        let records =
            vec![rsvp(RsvpStatus::Going), rsvp(RsvpStatus::Going), rsvp(RsvpStatus::Maybe)];
        assert_eq!(aggregate(&records), RsvpCounts { going: 2, maybe: 1, not_going: 0 });
    }

    #[test]
    fn aggregate_of_nothing_is_all_zeroes() {
        assert_eq!(aggregate(&[]), RsvpCounts::default());
    }

    #[test]
    fn capacity_check_compares_going_against_the_cap() {
        let counts = RsvpCounts { going: 3, maybe: 5, not_going: 2 };
        assert!(has_capacity(counts, Some(4)));
        assert!(!has_capacity(counts, Some(3)));
        assert!(has_capacity(counts, None));
    }
}
