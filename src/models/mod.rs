pub mod availability;
pub mod event;

pub use availability::{SlotEntry, SlotSummary, SubmitAvailabilityRequest};
pub use event::{CreateEventRequest, CreatedEvent, Event, EventDetails, EventRow, NewEvent, TimeOfDay};
