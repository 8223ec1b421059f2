use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::db_timestamp;
use crate::models::{CreateEventRequest, CreatedEvent, Event, EventRow, NewEvent};
use crate::utils::error::{AppError, AppResult};

const SELECT_LIVE_EVENT: &str = r#"
    SELECT id, title, created_at, expires_at, allowed_dates, time_from, time_to
    FROM events
    WHERE id = ? AND expires_at > ?
"#;

/// Event definitions and their expiry.
#[derive(Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        request: CreateEventRequest,
        now: DateTime<Utc>,
    ) -> AppResult<CreatedEvent> {
        let new_event = NewEvent::try_from(request)?;
        self.insert(new_event, now).await
    }

    pub async fn insert(&self, new_event: NewEvent, now: DateTime<Utc>) -> AppResult<CreatedEvent> {
        // v4 UUIDs come from the OS CSPRNG.
        let id = Uuid::new_v4().to_string();
        let created_at = now.trunc_subsecs(3);
        let expires_at = created_at + Duration::days(i64::from(new_event.ttl_days));

        sqlx::query(
            r#"
            INSERT INTO events (id, title, created_at, expires_at, allowed_dates, time_from, time_to)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new_event.title)
        .bind(db_timestamp(created_at))
        .bind(db_timestamp(expires_at))
        .bind(Json(&new_event.allowed_dates))
        .bind(new_event.time_from.to_string())
        .bind(new_event.time_to.to_string())
        .execute(&self.pool)
        .await?;

        info!(
            event_id = %id,
            dates = new_event.allowed_dates.len(),
            ttl_days = new_event.ttl_days,
            "Event created"
        );

        Ok(CreatedEvent { id, expires_at })
    }

    /// Expired rows that the reaper has not removed yet read as absent.
    pub async fn find(&self, id: &str, now: DateTime<Utc>) -> AppResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(SELECT_LIVE_EVENT)
            .bind(id)
            .bind(db_timestamp(now))
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    pub async fn get(&self, id: &str, now: DateTime<Utc>) -> AppResult<Event> {
        self.find(id, now)
            .await?
            .ok_or_else(|| AppError::not_found(format!("event '{}' not found or expired", id)))
    }

    /// Removes the event together with its availability. `false` if there was no such event.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let slots = sqlx::query("DELETE FROM availability WHERE event_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let events = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        if events > 0 {
            info!(event_id = %id, slots, "Event deleted");
        }
        Ok(events > 0)
    }
}
