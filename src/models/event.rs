use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::SlotEntry;
use crate::utils::error::{AppError, AppResult};
use crate::validation;

/// Wall-clock time in `HH:MM`, kept as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self {
            minutes: hour * 60 + minute,
        })
    }

    pub fn minutes(self) -> u16 {
        self.minutes
    }
}

impl FromStr for TimeOfDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("'{}' is not a valid HH:MM time", s));

        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let two_digits = |hi: u8, lo: u8| -> Option<u16> {
            (hi.is_ascii_digit() && lo.is_ascii_digit())
                .then(|| u16::from(hi - b'0') * 10 + u16::from(lo - b'0'))
        };

        let hour = two_digits(bytes[0], bytes[1]).ok_or_else(invalid)?;
        let minute = two_digits(bytes[3], bytes[4]).ok_or_else(invalid)?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub allowed_dates: Vec<NaiveDate>,
    pub time_from: TimeOfDay,
    pub time_to: TimeOfDay,
}

/// Raw `events` row as stored in SQLite.
#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub allowed_dates: Json<Vec<NaiveDate>>,
    pub time_from: String,
    pub time_to: String,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str| {
            AppError::InternalServerError(format!("event {} has a corrupt {}", row.id, field))
        };
        let time_from = row.time_from.parse().map_err(|_| corrupt("time_from"))?;
        let time_to = row.time_to.parse().map_err(|_| corrupt("time_to"))?;

        Ok(Event {
            id: row.id,
            title: row.title,
            created_at: row.created_at,
            expires_at: row.expires_at,
            allowed_dates: row.allowed_dates.0,
            time_from,
            time_to,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub allowed_dates: Vec<String>,
    pub time_from: String,
    pub time_to: String,
    /// Left untyped so that a bad value falls back to the default TTL
    /// instead of rejecting the whole request.
    #[serde(default)]
    pub ttl_days: Option<Value>,
}

/// A creation request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub allowed_dates: Vec<NaiveDate>,
    pub time_from: TimeOfDay,
    pub time_to: TimeOfDay,
    pub ttl_days: u32,
}

impl TryFrom<CreateEventRequest> for NewEvent {
    type Error = AppError;

    fn try_from(request: CreateEventRequest) -> AppResult<Self> {
        Ok(NewEvent {
            title: validation::title(&request.title)?,
            allowed_dates: validation::allowed_dates(&request.allowed_dates)?,
            time_from: request.time_from.parse()?,
            time_to: request.time_to.parse()?,
            ttl_days: validation::ttl_days(request.ttl_days.as_ref()),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EventDetails {
    pub event: Event,
    pub slots: Vec<SlotEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> CreateEventRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_time_of_day_parsing() {
        assert_eq!("09:00".parse::<TimeOfDay>().unwrap().minutes(), 540);
        assert_eq!("23:59".parse::<TimeOfDay>().unwrap().minutes(), 1439);
        assert_eq!("00:00".parse::<TimeOfDay>().unwrap().to_string(), "00:00");

        for bad in ["9:00", "09:0", "24:00", "12:60", "ab:cd", "09-00", "09:000", ""] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_new_event_from_valid_request() {
        let new_event = NewEvent::try_from(request(json!({
            "title": "  Team sync  ",
            "allowedDates": ["2026-01-21", "2026-01-19", "2026-01-21"],
            "timeFrom": "09:00",
            "timeTo": "17:00",
            "ttlDays": 3
        })))
        .unwrap();

        assert_eq!(new_event.title, "Team sync");
        assert_eq!(
            new_event.allowed_dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 1, 19).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 21).unwrap(),
            ]
        );
        assert_eq!(new_event.ttl_days, 3);
    }

    #[test]
    fn test_inverted_window_is_accepted() {
        let new_event = NewEvent::try_from(request(json!({
            "title": "Late night",
            "allowedDates": ["2026-01-19"],
            "timeFrom": "22:00",
            "timeTo": "02:00"
        })))
        .unwrap();

        assert!(new_event.time_from > new_event.time_to);
        assert_eq!(new_event.ttl_days, validation::DEFAULT_TTL_DAYS);
    }

    #[test]
    fn test_new_event_rejects_bad_time() {
        let result = NewEvent::try_from(request(json!({
            "title": "Team sync",
            "allowedDates": ["2026-01-19"],
            "timeFrom": "9am",
            "timeTo": "17:00"
        })));

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = Event {
            id: "abc".to_string(),
            title: "Team sync".to_string(),
            created_at: "2026-01-01T00:00:00Z".parse().unwrap(),
            expires_at: "2026-01-15T00:00:00Z".parse().unwrap(),
            allowed_dates: vec![NaiveDate::from_ymd_opt(2026, 1, 19).unwrap()],
            time_from: "09:00".parse().unwrap(),
            time_to: "17:00".parse().unwrap(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["allowedDates"], json!(["2026-01-19"]));
        assert_eq!(value["timeFrom"], "09:00");
        assert_eq!(value["expiresAt"], "2026-01-15T00:00:00Z");
    }
}
