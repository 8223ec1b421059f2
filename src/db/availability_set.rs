use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::EventStore;
use crate::models::{SlotEntry, SubmitAvailabilityRequest};
use crate::utils::error::{AppError, AppResult};
use crate::validation::{self, canonical_timeslot, SlotValidator};

/// Post-commit hook fired after availability for an event changed.
///
/// Implementations must not block; delivery is best-effort.
pub trait AvailabilityNotifier: Send + Sync {
    fn availability_updated(&self, event_id: &str);
}

/// Per-participant slot submissions, unique per `(event, name, timeslot)`.
#[derive(Clone)]
pub struct AvailabilitySet {
    pool: SqlitePool,
    events: EventStore,
    validator: SlotValidator,
    notifier: Arc<dyn AvailabilityNotifier>,
}

impl AvailabilitySet {
    pub fn new(
        pool: SqlitePool,
        validator: SlotValidator,
        notifier: Arc<dyn AvailabilityNotifier>,
    ) -> Self {
        Self {
            events: EventStore::new(pool.clone()),
            pool,
            validator,
            notifier,
        }
    }

    /// Stores the whole batch or nothing. Already stored slots are skipped,
    /// so resubmitting the same batch changes nothing.
    pub async fn submit(
        &self,
        event_id: &str,
        request: SubmitAvailabilityRequest,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let name = validation::participant_name(&request.name)?;
        let timeslots = validation::timeslots(&request.timeslots)?;

        let event = self.events.get(event_id, now).await?;

        if let Some(rejected) = timeslots
            .iter()
            .find(|slot| !self.validator.is_allowed(&event, **slot))
        {
            return Err(AppError::validation(format!(
                "timeslot {} is outside the allowed dates and times",
                canonical_timeslot(*rejected)
            )));
        }

        let inserted = self
            .insert_batch(&event.id, &name, &timeslots)
            .await
            .map_err(|e| event_gone(e, &event.id))?;

        info!(
            event_id = %event.id,
            submitted = timeslots.len(),
            inserted,
            "Availability saved"
        );

        self.notifier.availability_updated(&event.id);
        Ok(())
    }

    async fn insert_batch(
        &self,
        event_id: &str,
        name: &str,
        timeslots: &[DateTime<Utc>],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for slot in timeslots {
            inserted += sqlx::query(
                "INSERT OR IGNORE INTO availability (event_id, name, timeslot) VALUES (?, ?, ?)",
            )
            .bind(event_id)
            .bind(name)
            .bind(canonical_timeslot(*slot))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Stored rows of one event, ordered by timeslot then name.
    pub async fn list_raw(&self, event_id: &str) -> AppResult<Vec<SlotEntry>> {
        let rows = sqlx::query_as::<_, SlotEntry>(
            "SELECT name, timeslot FROM availability WHERE event_id = ? ORDER BY timeslot, name",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// The event was deleted or reaped after the lookup; the foreign key rejects the rows.
fn event_gone(err: sqlx::Error, event_id: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::not_found(format!("event '{}' not found or expired", event_id))
        }
        _ => AppError::from(err),
    }
}
