use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::with_security_headers;

use crate::validation::SlotValidator;
use crate::websocket::broadcaster::DEFAULT_BUFFER;

const DEFAULT_DATABASE_URL: &str = "sqlite://meetingfinder.db";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 3600;
const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub reaper_interval: Duration,
    /// Offset from UTC in which allowed dates and the daily window are read.
    pub slot_utc_offset_minutes: i32,
    pub broadcast_buffer: usize,
    pub cors_allowed_origins: Vec<String>,
    /// Production mode enables HSTS.
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values are logged
    /// and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let database_max_connections =
            parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS).max(1);
        let host = parse_or(&lookup, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);

        let reaper_secs =
            parse_or(&lookup, "REAPER_INTERVAL_SECS", DEFAULT_REAPER_INTERVAL_SECS).max(1);

        let mut slot_utc_offset_minutes: i32 = parse_or(&lookup, "SLOT_UTC_OFFSET_MINUTES", 0);
        if slot_utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            tracing::warn!(
                "Config: SLOT_UTC_OFFSET_MINUTES={} is out of range, using UTC",
                slot_utc_offset_minutes
            );
            slot_utc_offset_minutes = 0;
        }

        let broadcast_buffer = parse_or(&lookup, "BROADCAST_BUFFER", DEFAULT_BUFFER).max(1);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let production = lookup("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        Self {
            database_url,
            database_max_connections,
            host,
            port,
            reaper_interval: Duration::from_secs(reaper_secs),
            slot_utc_offset_minutes,
            broadcast_buffer,
            cors_allowed_origins,
            production,
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn slot_validator(&self) -> SlotValidator {
        SlotValidator::from_offset_minutes(self.slot_utc_offset_minutes).unwrap_or_default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Config: invalid {} '{}': {}, using {}", key, raw, e, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.server_addr().port(), 3000);
        assert_eq!(config.reaper_interval, Duration::from_secs(3600));
        assert_eq!(config.slot_validator(), SlotValidator::utc());
        assert_eq!(config.cors_allowed_origins.len(), 2);
        assert!(!config.production);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("PORT", "8080"),
            ("REAPER_INTERVAL_SECS", "60"),
            ("SLOT_UTC_OFFSET_MINUTES", "-300"),
            ("CORS_ALLOWED_ORIGINS", "https://meetingfinder.de, ,"),
            ("RUST_ENV", "Production"),
        ]);

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.port, 8080);
        assert_eq!(config.reaper_interval, Duration::from_secs(60));
        assert_eq!(
            config.slot_validator(),
            SlotValidator::from_offset_minutes(-300).unwrap()
        );
        assert_eq!(config.cors_allowed_origins, vec!["https://meetingfinder.de"]);
        assert!(config.production);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("PORT", "eighty"),
            ("REAPER_INTERVAL_SECS", "0"),
            ("SLOT_UTC_OFFSET_MINUTES", "1440"),
            ("BROADCAST_BUFFER", "-1"),
        ]);

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.reaper_interval, Duration::from_secs(1));
        assert_eq!(config.slot_utc_offset_minutes, 0);
        assert_eq!(config.broadcast_buffer, DEFAULT_BUFFER);
    }
}
