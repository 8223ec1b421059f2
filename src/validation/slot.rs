use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};

use crate::models::Event;

/// Checks a timestamp against an event's allowed dates and daily window.
///
/// Allowed dates carry no zone, so both the calendar date and the minute of
/// day are read in one fixed reference offset. The default is UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotValidator {
    reference: FixedOffset,
}

impl SlotValidator {
    pub fn new(reference: FixedOffset) -> Self {
        Self { reference }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// `None` when the offset is a day or more away from UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn reference(&self) -> FixedOffset {
        self.reference
    }

    pub fn is_allowed(&self, event: &Event, timestamp: DateTime<Utc>) -> bool {
        let local = timestamp.with_timezone(&self.reference);
        if !event.allowed_dates.contains(&local.date_naive()) {
            return false;
        }

        let minute_of_day = local.hour() * 60 + local.minute();
        let from = u32::from(event.time_from.minutes());
        let to = u32::from(event.time_to.minutes());
        from <= minute_of_day && minute_of_day <= to
    }
}

impl Default for SlotValidator {
    fn default() -> Self {
        Self::utc()
    }
}
