use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::{AggregationEngine, AvailabilitySet, EventStore};
use crate::validation::SlotValidator;
use crate::websocket::Broadcaster;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: EventStore,
    pub availability: AvailabilitySet,
    pub aggregation: AggregationEngine,
    pub broadcaster: Broadcaster,
}

impl AppState {
    /// Wires the stores to one pool; successful submissions notify `broadcaster`.
    pub fn new(db: SqlitePool, broadcaster: Broadcaster, validator: SlotValidator) -> Self {
        let events = EventStore::new(db.clone());
        let availability =
            AvailabilitySet::new(db.clone(), validator, Arc::new(broadcaster.clone()));
        let aggregation = AggregationEngine::new(events.clone(), availability.clone());

        Self {
            db,
            events,
            availability,
            aggregation,
            broadcaster,
        }
    }
}
