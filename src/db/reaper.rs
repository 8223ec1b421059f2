use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::db::db_timestamp;
use crate::utils::error::AppResult;

/// Deletes events whose `expires_at` has passed, together with their availability.
#[derive(Clone)]
pub struct ExpirationReaper {
    pool: SqlitePool,
    // Serializes sweeps across clones.
    running: Arc<Mutex<()>>,
}

impl ExpirationReaper {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the number of events removed.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let _guard = self.running.lock().await;
        let cutoff = db_timestamp(now);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM availability WHERE event_id IN (SELECT id FROM events WHERE expires_at <= ?)",
        )
        .bind(&cutoff)
        .execute(&mut *tx)
        .await?;
        let removed = sqlx::query("DELETE FROM events WHERE expires_at <= ?")
            .bind(&cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if removed > 0 {
            info!(removed, "Cleanup: removed expired events");
        } else {
            debug!("Cleanup: nothing expired");
        }
        Ok(removed)
    }

    /// Sweeps immediately, then once per `period`. Failures are logged and
    /// the loop carries on.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(Utc::now()).await {
                    error!(error = ?e, "Cleanup sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, EventStore};
    use crate::models::NewEvent;
    use chrono::NaiveDate;

    fn new_event(ttl_days: u32) -> NewEvent {
        NewEvent {
            title: "Offsite".to_string(),
            allowed_dates: vec![NaiveDate::from_ymd_opt(2026, 1, 19).unwrap()],
            time_from: "09:00".parse().unwrap(),
            time_to: "17:00".parse().unwrap(),
            ttl_days,
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let pool = connect_in_memory().await.unwrap();
        let store = EventStore::new(pool.clone());
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();

        let short = store.insert(new_event(1), start).await.unwrap();
        let long = store.insert(new_event(30), start).await.unwrap();
        sqlx::query(
            "INSERT INTO availability (event_id, name, timeslot) VALUES (?, 'Ana', '2026-01-19T10:00:00Z')",
        )
        .bind(&short.id)
        .execute(&pool)
        .await
        .unwrap();

        let reaper = ExpirationReaper::new(pool.clone());
        assert_eq!(reaper.sweep(start).await.unwrap(), 0);
        assert_eq!(reaper.sweep(short.expires_at).await.unwrap(), 1);
        assert_eq!(reaper.sweep(short.expires_at).await.unwrap(), 0);

        assert_eq!(count(&pool, "events").await, 1);
        assert_eq!(count(&pool, "availability").await, 0);
        assert!(store.find(&long.id, start).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_sweeps_do_not_double_count() {
        let pool = connect_in_memory().await.unwrap();
        let store = EventStore::new(pool.clone());
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        for _ in 0..3 {
            store.insert(new_event(1), start).await.unwrap();
        }

        let reaper = ExpirationReaper::new(pool);
        let other = reaper.clone();
        let later = start + chrono::Duration::days(2);
        let (a, b) = tokio::join!(reaper.sweep(later), other.sweep(later));

        assert_eq!(a.unwrap() + b.unwrap(), 3);
    }
}
