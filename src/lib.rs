pub mod api_server;
pub mod config;
pub mod export;
pub mod models;
pub mod recurrence;
pub mod rsvp;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use export::{serialize, ExportError};
pub use models::{
    Event, EventDraft, EventPatch, Frequency, LocationType, RecurrenceRule, Rsvp, RsvpDraft,
    RsvpPatch, RsvpStatus,
};
pub use recurrence::{expand, materialize};
pub use rsvp::{aggregate, RsvpCounts};
pub use store::{EventFilter, EventStore, StoreError};
