//! Input rules shared by event creation and availability submission.

mod slot;

pub use slot::SlotValidator;

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

use crate::utils::error::{AppError, AppResult};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 120;
pub const NAME_MAX_CHARS: usize = 60;
pub const MAX_TIMESLOTS: usize = 1000;
pub const DEFAULT_TTL_DAYS: u32 = 14;
pub const MAX_TTL_DAYS: u32 = 3650;

pub fn title(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
        return Err(AppError::validation(format!(
            "title must be between {} and {} characters",
            TITLE_MIN_CHARS, TITLE_MAX_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Parses a date in the exact `YYYY-MM-DD` shape.
pub fn calendar_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Deduplicated and sorted ascending.
pub fn allowed_dates(raw: &[String]) -> AppResult<Vec<NaiveDate>> {
    if raw.is_empty() {
        return Err(AppError::validation("allowedDates must not be empty"));
    }

    let dates = raw
        .iter()
        .map(|value| {
            calendar_date(value).ok_or_else(|| {
                AppError::validation(format!("'{}' is not a valid YYYY-MM-DD date", value))
            })
        })
        .collect::<AppResult<BTreeSet<_>>>()?;

    Ok(dates.into_iter().collect())
}

/// Anything but a positive integer up to [`MAX_TTL_DAYS`] yields the default.
pub fn ttl_days(raw: Option<&Value>) -> u32 {
    raw.and_then(Value::as_u64)
        .filter(|days| (1..=u64::from(MAX_TTL_DAYS)).contains(days))
        .and_then(|days| u32::try_from(days).ok())
        .unwrap_or(DEFAULT_TTL_DAYS)
}

pub fn participant_name(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(AppError::validation(format!(
            "name must be between 1 and {} characters",
            NAME_MAX_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

pub fn timeslots(raw: &[String]) -> AppResult<Vec<DateTime<Utc>>> {
    if raw.is_empty() || raw.len() > MAX_TIMESLOTS {
        return Err(AppError::validation(format!(
            "timeslots must contain between 1 and {} entries",
            MAX_TIMESLOTS
        )));
    }

    raw.iter()
        .map(|value| {
            DateTime::parse_from_rfc3339(value.trim())
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| AppError::validation(format!("'{}' is not a valid timestamp", value)))
        })
        .collect()
}

/// Storage form of a timeslot: UTC, `Z` suffix, fractional seconds only when present.
pub fn canonical_timeslot(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_bounds() {
        assert!(title("ab").is_err());
        assert!(title("   ab   ").is_err());
        assert_eq!(title("  abc ").unwrap(), "abc");
        assert!(title(&"x".repeat(120)).is_ok());
        assert!(title(&"x".repeat(121)).is_err());
    }

    #[test]
    fn test_calendar_date_shape() {
        assert!(calendar_date("2026-01-19").is_some());
        assert!(calendar_date("2026-1-19").is_none());
        assert!(calendar_date("2026-02-30").is_none());
        assert!(calendar_date("2026/01/19").is_none());
        assert!(calendar_date("20260-1-19").is_none());
    }

    #[test]
    fn test_allowed_dates_rejects_empty_and_malformed() {
        assert!(allowed_dates(&[]).is_err());
        assert!(allowed_dates(&["2026-01-19".to_string(), "tomorrow".to_string()]).is_err());
    }

    #[test]
    fn test_ttl_days_falls_back_to_default() {
        assert_eq!(ttl_days(None), DEFAULT_TTL_DAYS);
        assert_eq!(ttl_days(Some(&json!(7))), 7);
        assert_eq!(ttl_days(Some(&json!(0))), DEFAULT_TTL_DAYS);
        assert_eq!(ttl_days(Some(&json!(-3))), DEFAULT_TTL_DAYS);
        assert_eq!(ttl_days(Some(&json!(2.5))), DEFAULT_TTL_DAYS);
        assert_eq!(ttl_days(Some(&json!("7"))), DEFAULT_TTL_DAYS);
        assert_eq!(ttl_days(Some(&json!(MAX_TTL_DAYS + 1))), DEFAULT_TTL_DAYS);
    }

    #[test]
    fn test_participant_name_bounds() {
        assert!(participant_name("   ").is_err());
        assert_eq!(participant_name(" Ana ").unwrap(), "Ana");
        assert!(participant_name(&"n".repeat(60)).is_ok());
        assert!(participant_name(&"n".repeat(61)).is_err());
    }

    #[test]
    fn test_timeslot_batch_limits() {
        assert!(timeslots(&[]).is_err());

        let too_many = vec!["2026-01-19T10:00:00Z".to_string(); MAX_TIMESLOTS + 1];
        assert!(timeslots(&too_many).is_err());

        let at_limit = vec!["2026-01-19T10:00:00Z".to_string(); MAX_TIMESLOTS];
        assert_eq!(timeslots(&at_limit).unwrap().len(), MAX_TIMESLOTS);

        assert!(timeslots(&["not a time".to_string()]).is_err());
    }

    #[test]
    fn test_canonical_timeslot_normalizes_offsets() {
        let parsed = timeslots(&[
            "2026-01-19T11:00:00+01:00".to_string(),
            "2026-01-19T10:00:00Z".to_string(),
        ])
        .unwrap();

        assert_eq!(canonical_timeslot(parsed[0]), "2026-01-19T10:00:00Z");
        assert_eq!(canonical_timeslot(parsed[0]), canonical_timeslot(parsed[1]));
    }
}
