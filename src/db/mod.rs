pub mod aggregation;
pub mod availability_set;
pub mod event_store;
pub mod reaper;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

pub use aggregation::AggregationEngine;
pub use availability_set::{AvailabilityNotifier, AvailabilitySet};
pub use event_store::EventStore;
pub use reaper::ExpirationReaper;

/// Opens the pool described by `config` and applies pending migrations.
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    if config.database_url.contains(":memory:") {
        return connect_in_memory().await;
    }

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// A private in-memory database. An in-memory SQLite database lives and dies
/// with its connection, so the pool holds exactly one that never expires.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

/// Fixed-width UTC text so that `<`/`>` in SQL compare chronologically.
pub(crate) fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_timestamp_is_fixed_width() {
        let whole: DateTime<Utc> = "2026-01-19T10:00:00Z".parse().unwrap();
        let fractional: DateTime<Utc> = "2026-01-19T10:00:00.5Z".parse().unwrap();

        assert_eq!(db_timestamp(whole), "2026-01-19T10:00:00.000Z");
        assert_eq!(db_timestamp(fractional), "2026-01-19T10:00:00.500Z");
        assert!(db_timestamp(whole) < db_timestamp(fractional));
    }

    #[tokio::test]
    async fn test_in_memory_pool_is_migrated() {
        let pool = connect_in_memory().await.unwrap();

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('events', 'availability')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(tables, 2);
    }
}
