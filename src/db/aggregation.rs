use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::db::{AvailabilitySet, EventStore};
use crate::models::{SlotEntry, SlotSummary};
use crate::utils::error::AppResult;

/// Derives the per-slot popularity view of an event on demand.
#[derive(Clone)]
pub struct AggregationEngine {
    events: EventStore,
    availability: AvailabilitySet,
}

impl AggregationEngine {
    pub fn new(events: EventStore, availability: AvailabilitySet) -> Self {
        Self {
            events,
            availability,
        }
    }

    /// Missing or expired events are an error, never an empty list.
    pub async fn aggregate(&self, event_id: &str, now: DateTime<Utc>) -> AppResult<Vec<SlotSummary>> {
        let event = self.events.get(event_id, now).await?;
        let rows = self.availability.list_raw(&event.id).await?;
        Ok(summarize(rows))
    }
}

/// Groups rows by timeslot with distinct, sorted names. Output is ordered by
/// instant, falling back to text order for anything unparseable.
pub fn summarize(rows: impl IntoIterator<Item = SlotEntry>) -> Vec<SlotSummary> {
    let mut by_slot: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in rows {
        by_slot.entry(row.timeslot).or_default().insert(row.name);
    }

    let mut summaries: Vec<SlotSummary> = by_slot
        .into_iter()
        .map(|(timeslot, names)| SlotSummary {
            timeslot,
            count: names.len(),
            names: names.into_iter().collect(),
        })
        .collect();

    summaries.sort_by_cached_key(|summary| {
        (
            DateTime::parse_from_rfc3339(&summary.timeslot).ok(),
            summary.timeslot.clone(),
        )
    });
    summaries
}
