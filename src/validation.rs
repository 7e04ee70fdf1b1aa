//! Field-shape validation for incoming event and RSVP payloads.
//
// Everything here runs before a value reaches the recurrence engine or the
// store; downstream code trusts these bounds and does not re-check them.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::{EventDraft, EventPatch, LocationType, RsvpDraft, RsvpPatch};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_ORGANIZER_LENGTH: usize = 100;
pub const MAX_INTERVAL: u32 = 365;

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap()
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("Title must be at most {MAX_TITLE_LENGTH} characters")]
    TitleTooLong,
    #[error("Description must be at most {MAX_DESCRIPTION_LENGTH} characters")]
    DescriptionTooLong,
    #[error("Organizer must be at most {MAX_ORGANIZER_LENGTH} characters")]
    OrganizerTooLong,
    #[error("Invalid time format (expected HH:MM): {0}")]
    InvalidTime(String),
    #[error("Recurring events require a frequency")]
    MissingFrequency,
    #[error("Interval must be between 1 and {MAX_INTERVAL}")]
    IntervalOutOfRange(u32),
    #[error("Online and hybrid events require a meeting URL")]
    MissingMeetingUrl,
    #[error("Attendee name must not be empty")]
    EmptyAttendeeName,
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

pub fn validate_time_format(time: &str) -> bool {
    TIME_RE.is_match(time)
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_event_draft(draft: &EventDraft) -> Result<(), ValidationError> {
    validate_title(&draft.title)?;
    validate_optional_text(draft.description.as_deref(), draft.organizer.as_deref())?;
    if let Some(time) = draft.time.as_deref() {
        if !validate_time_format(time) {
            return Err(ValidationError::InvalidTime(time.to_string()));
        }
    }
    if draft.is_recurring {
        if draft.frequency.is_none() {
            return Err(ValidationError::MissingFrequency);
        }
        if let Some(interval) = draft.interval {
            if interval < 1 || interval > MAX_INTERVAL {
                return Err(ValidationError::IntervalOutOfRange(interval));
            }
        }
    }
    if matches!(draft.location_type, Some(LocationType::Online | LocationType::Hybrid))
        && draft.meeting_url.as_deref().map_or(true, str::is_empty)
    {
        return Err(ValidationError::MissingMeetingUrl);
    }
    Ok(())
}

pub fn validate_event_patch(patch: &EventPatch) -> Result<(), ValidationError> {
    if let Some(title) = patch.title.as_deref() {
        validate_title(title)?;
    }
    validate_optional_text(patch.description.as_deref(), patch.organizer.as_deref())?;
    if let Some(time) = patch.time.as_deref() {
        if !validate_time_format(time) {
            return Err(ValidationError::InvalidTime(time.to_string()));
        }
    }
    Ok(())
}

pub fn validate_rsvp_draft(draft: &RsvpDraft) -> Result<(), ValidationError> {
    if draft.attendee_name.trim().is_empty() {
        return Err(ValidationError::EmptyAttendeeName);
    }
    validate_rsvp_email(draft.attendee_email.as_deref())
}

pub fn validate_rsvp_patch(patch: &RsvpPatch) -> Result<(), ValidationError> {
    if let Some(name) = patch.attendee_name.as_deref() {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyAttendeeName);
        }
    }
    validate_rsvp_email(patch.attendee_email.as_deref())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

fn validate_optional_text(
    description: Option<&str>,
    organizer: Option<&str>,
) -> Result<(), ValidationError> {
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH) {
        return Err(ValidationError::DescriptionTooLong);
    }
    if organizer.is_some_and(|o| o.chars().count() > MAX_ORGANIZER_LENGTH) {
        return Err(ValidationError::OrganizerTooLong);
    }
    Ok(())
}

fn validate_rsvp_email(email: Option<&str>) -> Result<(), ValidationError> {
    if let Some(email) = email {
        if !validate_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
    }
    Ok(())
}
