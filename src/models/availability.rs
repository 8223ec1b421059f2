use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAvailabilityRequest {
    pub name: String,
    pub timeslots: Vec<String>,
}

/// One stored `(name, timeslot)` pair of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SlotEntry {
    pub name: String,
    pub timeslot: String,
}

/// Popularity of a single observed timeslot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSummary {
    pub timeslot: String,
    pub count: usize,
    pub names: Vec<String>,
}
