use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How often a recurring event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Uppercase name used in RRULE lines.
    pub fn ical_name(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    InPerson,
    Online,
    Hybrid,
}

/// A stored calendar event.
///
/// A recurring event keeps its rule fields set; the occurrences generated
/// from it are stored as separate rows pointing back via `parent_event_id`
/// with all rule fields cleared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    /// 24h clock, "HH:MM". Validated upstream.
    pub time: Option<String>,
    pub organizer: Option<String>,
    pub location_type: Option<LocationType>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub meeting_url: Option<String>,
    pub max_attendees: Option<u32>,
    pub is_recurring: bool,
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    pub recurrence_end_date: Option<NaiveDate>,
    pub parent_event_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn recurrence_rule(&self) -> RecurrenceRule {
        RecurrenceRule {
            is_recurring: self.is_recurring,
            frequency: self.frequency,
            interval: self.interval,
            end_date: self.recurrence_end_date,
        }
    }
}

/// The recurrence fields of an event, viewed as one value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrenceRule {
    pub is_recurring: bool,
    pub frequency: Option<Frequency>,
    pub interval: Option<u32>,
    pub end_date: Option<NaiveDate>,
}

/// Payload for creating an event. The store assigns the id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub location_type: Option<LocationType>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub meeting_url: Option<String>,
    #[serde(default)]
    pub max_attendees: Option<u32>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub recurrence_end_date: Option<NaiveDate>,
}

/// Partial update for an event. A present field is applied, an absent field
/// is left untouched; an all-absent patch is rejected by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub location_type: Option<LocationType>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub meeting_url: Option<String>,
    #[serde(default)]
    pub max_attendees: Option<u32>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.organizer.is_none()
            && self.location_type.is_none()
            && self.location_name.is_none()
            && self.location_address.is_none()
            && self.meeting_url.is_none()
            && self.max_attendees.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    NotGoing,
    Maybe,
}

/// An attendee's response to a single event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: i64,
    pub event_id: i64,
    pub attendee_name: String,
    pub attendee_email: Option<String>,
    pub status: RsvpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsvpDraft {
    pub attendee_name: String,
    #[serde(default)]
    pub attendee_email: Option<String>,
    pub status: RsvpStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RsvpPatch {
    #[serde(default)]
    pub attendee_name: Option<String>,
    #[serde(default)]
    pub attendee_email: Option<String>,
    #[serde(default)]
    pub status: Option<RsvpStatus>,
}

impl RsvpPatch {
    pub fn is_empty(&self) -> bool {
        self.attendee_name.is_none() && self.attendee_email.is_none() && self.status.is_none()
    }
}
