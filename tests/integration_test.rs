use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use commcal::{
    export, rsvp, EventDraft, EventFilter, EventStore, Frequency, LocationType, RsvpDraft,
    RsvpStatus, StoreError,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn base_draft(title: &str, on: NaiveDate) -> EventDraft {
    EventDraft {
        title: title.to_string(),
        description: None,
        date: on,
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
    }
}

#[test]
fn recurring_event_round_trips_into_the_export_document() -> Result<()> {
    let dir = tempdir()?;
    let store = EventStore::new(dir.path())?;

    let mut draft = base_draft("Weekly Market", date(2024, 3, 4));
    draft.time = Some("09:00".to_string());
    draft.organizer = Some("Town Council".to_string());
    draft.is_recurring = true;
    draft.frequency = Some(Frequency::Weekly);
    draft.interval = Some(1);
    draft.recurrence_end_date = Some(date(2024, 3, 25));
    let parent = store.create_event(draft)?;

    let all = store.list_events(&EventFilter::default());
    // Parent plus the three materialized Mondays.
    assert_eq!(all.len(), 4);
    let child_dates: Vec<NaiveDate> =
        all.iter().filter(|e| e.parent_event_id == Some(parent.id)).map(|e| e.date).collect();
    assert_eq!(child_dates, vec![date(2024, 3, 11), date(2024, 3, 18), date(2024, 3, 25)]);

    let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let document = export::serialize(&all, now)?;

    // Every row serializes flat; the parent additionally declares its rule.
    assert_eq!(document.matches("BEGIN:VEVENT").count(), 4);
    assert_eq!(
        document.matches("RRULE:FREQ=WEEKLY;INTERVAL=1;UNTIL=20240325T000000Z").count(),
        1
    );
    assert_eq!(document.matches("SUMMARY:Weekly Market").count(), 4);
    Ok(())
}

#[test]
fn export_of_an_empty_store_is_refused() -> Result<()> {
    let dir = tempdir()?;
    let store = EventStore::new(dir.path())?;
    let events = store.list_events(&EventFilter::default());
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    assert!(export::serialize(&events, now).is_err());
    Ok(())
}

#[test]
fn rsvps_track_capacity_across_a_full_lifecycle() -> Result<()> {
    let dir = tempdir()?;
    let store = EventStore::new(dir.path())?;

    let mut draft = base_draft("Workshop", date(2024, 5, 20));
    draft.location_type = Some(LocationType::Hybrid);
    draft.location_name = Some("Maker Space".to_string());
    draft.meeting_url = Some("https://meet.example/ws".to_string());
    draft.max_attendees = Some(2);
    let event = store.create_event(draft)?;

    let going = |name: &str, email: &str| RsvpDraft {
        attendee_name: name.to_string(),
        attendee_email: Some(email.to_string()),
        status: RsvpStatus::Going,
    };
    store.insert_rsvp(event.id, going("Alex", "alex@example.com"))?;
    store.insert_rsvp(event.id, going("Sam", "sam@example.com"))?;
    let maybe = store.insert_rsvp(
        event.id,
        RsvpDraft {
            attendee_name: "Kim".to_string(),
            attendee_email: Some("kim@example.com".to_string()),
            status: RsvpStatus::Maybe,
        },
    )?;

    let counts = rsvp::aggregate(&store.list_rsvps(event.id)?);
    assert_eq!((counts.going, counts.maybe, counts.not_going), (2, 1, 0));
    // The cap is full; the capacity gate is what the API layer consults.
    assert!(!rsvp::has_capacity(counts, event.max_attendees));

    store.delete_rsvp(maybe.id)?;
    assert_eq!(store.list_rsvps(event.id)?.len(), 2);

    store.delete_event(event.id)?;
    assert!(matches!(store.list_rsvps(event.id), Err(StoreError::EventNotFound)));
    Ok(())
}

#[test]
fn monthly_series_created_on_the_31st_survives_short_months() -> Result<()> {
    let dir = tempdir()?;
    let store = EventStore::new(dir.path())?;

    let mut draft = base_draft("Rent Reminder", date(2024, 1, 31));
    draft.is_recurring = true;
    draft.frequency = Some(Frequency::Monthly);
    draft.interval = Some(1);
    draft.recurrence_end_date = Some(date(2024, 4, 30));
    let parent = store.create_event(draft)?;

    let child_dates: Vec<NaiveDate> = store
        .list_events(&EventFilter::default())
        .into_iter()
        .filter(|e| e.parent_event_id == Some(parent.id))
        .map(|e| e.date)
        .collect();
    assert_eq!(child_dates, vec![date(2024, 2, 29), date(2024, 3, 29), date(2024, 4, 29)]);
    Ok(())
}
