//! JSON-file-backed store for events and RSVPs.
//
// Persistence follows the same shape as the rest of the app's state
// handling: one JSON file per record type under a state directory, loaded
// whole at startup and rewritten after each mutation. All mutation happens
// under one mutex and is flushed before the lock is released, so a cascade
// (event + children + their RSVPs) is never observable half-applied.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::models::{Event, EventDraft, EventPatch, Rsvp, RsvpDraft, RsvpPatch};
use crate::recurrence;

const EVENTS_FILE: &str = "events.json";
const RSVPS_FILE: &str = "rsvps.json";
// Maximum allowed size for state files to prevent loading runaway data (10MB)
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Event not found")]
    EventNotFound,
    #[error("RSVP not found")]
    RsvpNotFound,
    #[error("No fields to update")]
    EmptyPatch,
    #[error("An RSVP with this email already exists for this event")]
    DuplicateRsvp,
    #[error("Failed to persist store state: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode store state: {0}")]
    Json(#[from] serde_json::Error),
}

/// Optional filters for event listing; all present filters must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub organizer: Option<String>,
}

/// Store-level statistics, mirroring the stats endpoint payload.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarStats {
    pub total_events: usize,
    pub events_this_month: usize,
    pub upcoming_events: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    events: Vec<Event>,
    rsvps: Vec<Rsvp>,
    next_event_id: i64,
    next_rsvp_id: i64,
}

pub struct EventStore {
    state_dir: PathBuf,
    inner: Mutex<StoreState>,
}

impl EventStore {
    /// Open (or create) a store rooted at the given state directory.
    pub fn new(state_dir: impl Into<PathBuf>) -> Result<Self> {
        let state_dir = state_dir.into();
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;

        let events: Vec<Event> = load_file(&state_dir.join(EVENTS_FILE))?;
        let rsvps: Vec<Rsvp> = load_file(&state_dir.join(RSVPS_FILE))?;
        let next_event_id = events.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let next_rsvp_id = rsvps.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        info!(
            "Opened event store at {} ({} events, {} RSVPs)",
            state_dir.display(),
            events.len(),
            rsvps.len()
        );
        Ok(Self {
            state_dir,
            inner: Mutex::new(StoreState { events, rsvps, next_event_id, next_rsvp_id }),
        })
    }

    /// Insert one event record and assign its id.
    pub fn insert_event(
        &self,
        draft: EventDraft,
        parent_event_id: Option<i64>,
    ) -> Result<Event, StoreError> {
        let mut state = self.state();
        let now = Utc::now();
        let event = Event {
            id: state.next_event_id,
            title: draft.title,
            description: draft.description,
            date: draft.date,
            time: draft.time,
            organizer: draft.organizer,
            location_type: draft.location_type,
            location_name: draft.location_name,
            location_address: draft.location_address,
            meeting_url: draft.meeting_url,
            max_attendees: draft.max_attendees,
            is_recurring: draft.is_recurring,
            frequency: draft.frequency,
            interval: draft.interval,
            recurrence_end_date: draft.recurrence_end_date,
            parent_event_id,
            created_at: now,
            updated_at: now,
        };
        state.next_event_id += 1;
        state.events.push(event.clone());
        self.save_events(&state)?;
        debug!("Inserted event {} ({})", event.id, event.title);
        Ok(event)
    }

    /// Create an event and, when it is recurring, its materialized
    /// occurrences in one pass. Returns the parent record.
    pub fn create_event(&self, draft: EventDraft) -> Result<Event, StoreError> {
        let parent = self.insert_event(draft, None)?;
        if parent.is_recurring {
            let dates = recurrence::expand(parent.date, &parent.recurrence_rule());
            let children = recurrence::materialize(&parent, &dates);
            let count = children.len();
            for child in children {
                self.insert_event(child, Some(parent.id))?;
            }
            info!("Created recurring event {} with {} occurrences", parent.id, count);
        }
        Ok(parent)
    }

    pub fn get_event(&self, id: i64) -> Option<Event> {
        self.state().events.iter().find(|e| e.id == id).cloned()
    }

    /// List events matching the filter, ordered by date then time
    /// (untimed events first within a date).
    pub fn list_events(&self, filter: &EventFilter) -> Vec<Event> {
        let state = self.state();
        let mut events: Vec<Event> = state
            .events
            .iter()
            .filter(|e| {
                filter.start_date.map_or(true, |d| e.date >= d)
                    && filter.end_date.map_or(true, |d| e.date <= d)
                    && filter.organizer.as_deref().map_or(true, |needle| {
                        e.organizer
                            .as_deref()
                            .is_some_and(|o| o.to_lowercase().contains(&needle.to_lowercase()))
                    })
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.time.cmp(&b.time)));
        events
    }

    /// All events on one date, ordered by time.
    pub fn events_on(&self, date: NaiveDate) -> Vec<Event> {
        let state = self.state();
        let mut events: Vec<Event> =
            state.events.iter().filter(|e| e.date == date).cloned().collect();
        events.sort_by(|a, b| a.time.cmp(&b.time));
        events
    }

    /// Apply a partial update. An all-absent patch is rejected.
    pub fn update_event(&self, id: i64, patch: EventPatch) -> Result<Event, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::EmptyPatch);
        }
        let mut state = self.state();
        let event =
            state.events.iter_mut().find(|e| e.id == id).ok_or(StoreError::EventNotFound)?;

        if let Some(title) = patch.title {
            event.title = title;
        }
        if let Some(description) = patch.description {
            event.description = Some(description);
        }
        if let Some(date) = patch.date {
            event.date = date;
        }
        if let Some(time) = patch.time {
            event.time = Some(time);
        }
        if let Some(organizer) = patch.organizer {
            event.organizer = Some(organizer);
        }
        if let Some(location_type) = patch.location_type {
            event.location_type = Some(location_type);
        }
        if let Some(location_name) = patch.location_name {
            event.location_name = Some(location_name);
        }
        if let Some(location_address) = patch.location_address {
            event.location_address = Some(location_address);
        }
        if let Some(meeting_url) = patch.meeting_url {
            event.meeting_url = Some(meeting_url);
        }
        if let Some(max_attendees) = patch.max_attendees {
            event.max_attendees = Some(max_attendees);
        }
        event.updated_at = Utc::now();
        let updated = event.clone();
        self.save_events(&state)?;
        Ok(updated)
    }

    /// Delete an event together with its materialized children and every
    /// RSVP attached to any of them, as one persistence step.
    pub fn delete_event(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state();
        if !state.events.iter().any(|e| e.id == id) {
            return Err(StoreError::EventNotFound);
        }
        let removed: Vec<i64> = state
            .events
            .iter()
            .filter(|e| e.id == id || e.parent_event_id == Some(id))
            .map(|e| e.id)
            .collect();
        state.events.retain(|e| !removed.contains(&e.id));
        state.rsvps.retain(|r| !removed.contains(&r.event_id));
        self.save_all(&state)?;
        info!("Deleted event {} and {} linked records", id, removed.len() - 1);
        Ok(())
    }

    pub fn insert_rsvp(&self, event_id: i64, draft: RsvpDraft) -> Result<Rsvp, StoreError> {
        let mut state = self.state();
        if !state.events.iter().any(|e| e.id == event_id) {
            return Err(StoreError::EventNotFound);
        }
        if let Some(email) = draft.attendee_email.as_deref() {
            let taken = state
                .rsvps
                .iter()
                .any(|r| r.event_id == event_id && r.attendee_email.as_deref() == Some(email));
            if taken {
                return Err(StoreError::DuplicateRsvp);
            }
        }
        let now = Utc::now();
        let rsvp = Rsvp {
            id: state.next_rsvp_id,
            event_id,
            attendee_name: draft.attendee_name,
            attendee_email: draft.attendee_email,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        state.next_rsvp_id += 1;
        state.rsvps.push(rsvp.clone());
        self.save_rsvps(&state)?;
        Ok(rsvp)
    }

    pub fn get_rsvp(&self, id: i64) -> Option<Rsvp> {
        self.state().rsvps.iter().find(|r| r.id == id).cloned()
    }

    pub fn list_rsvps(&self, event_id: i64) -> Result<Vec<Rsvp>, StoreError> {
        let state = self.state();
        if !state.events.iter().any(|e| e.id == event_id) {
            return Err(StoreError::EventNotFound);
        }
        Ok(state.rsvps.iter().filter(|r| r.event_id == event_id).cloned().collect())
    }

    pub fn update_rsvp(&self, id: i64, patch: RsvpPatch) -> Result<Rsvp, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::EmptyPatch);
        }
        let mut state = self.state();
        let (event_id, current_email) = {
            let rsvp = state.rsvps.iter().find(|r| r.id == id).ok_or(StoreError::RsvpNotFound)?;
            (rsvp.event_id, rsvp.attendee_email.clone())
        };
        if let Some(email) = patch.attendee_email.as_deref() {
            if current_email.as_deref() != Some(email) {
                let taken = state
                    .rsvps
                    .iter()
                    .any(|r| r.event_id == event_id && r.attendee_email.as_deref() == Some(email));
                if taken {
                    return Err(StoreError::DuplicateRsvp);
                }
            }
        }
        let rsvp = state
            .rsvps
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::RsvpNotFound)?;
        if let Some(name) = patch.attendee_name {
            rsvp.attendee_name = name;
        }
        if let Some(email) = patch.attendee_email {
            rsvp.attendee_email = Some(email);
        }
        if let Some(status) = patch.status {
            rsvp.status = status;
        }
        rsvp.updated_at = Utc::now();
        let updated = rsvp.clone();
        self.save_rsvps(&state)?;
        Ok(updated)
    }

    pub fn delete_rsvp(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.rsvps.len();
        state.rsvps.retain(|r| r.id != id);
        if state.rsvps.len() == before {
            return Err(StoreError::RsvpNotFound);
        }
        self.save_rsvps(&state)?;
        Ok(())
    }

    /// Event counts for the stats endpoint: everything stored, this calendar
    /// month, and the coming 30 days.
    pub fn stats(&self, now: DateTime<Utc>) -> CalendarStats {
        let state = self.state();
        let today = now.date_naive();
        let first_of_month = today.with_day(1).unwrap_or(today);
        let first_of_next_month = if today.month() == 12 {
            NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
        }
        .unwrap_or(today);
        let horizon = today + Duration::days(30);

        CalendarStats {
            total_events: state.events.len(),
            events_this_month: state
                .events
                .iter()
                .filter(|e| e.date >= first_of_month && e.date < first_of_next_month)
                .count(),
            upcoming_events: state
                .events
                .iter()
                .filter(|e| e.date >= today && e.date <= horizon)
                .count(),
            generated_at: now,
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().expect("store mutex poisoned")
    }

    fn save_events(&self, state: &StoreState) -> Result<(), StoreError> {
        save_file(&self.state_dir.join(EVENTS_FILE), &state.events)
    }

    fn save_rsvps(&self, state: &StoreState) -> Result<(), StoreError> {
        save_file(&self.state_dir.join(RSVPS_FILE), &state.rsvps)
    }

    fn save_all(&self, state: &StoreState) -> Result<(), StoreError> {
        self.save_events(state)?;
        self.save_rsvps(state)
    }
}

fn load_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_FILE_SIZE {
        anyhow::bail!("State file {} exceeds size limit", path.display());
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse state file {}", path.display()))
}

fn save_file<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, items)?;
    Ok(())
}
