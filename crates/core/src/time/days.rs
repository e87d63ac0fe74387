use crate::domain::stats::DateRange;
use crate::stats::error::StatsError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn parse_day(field: &'static str, value: &str) -> Result<NaiveDate, StatsError> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).map_err(|_| StatsError::Parse {
        field,
        value: value.to_string(),
    })
}

/// Calendar day of `now_utc` at the reporting offset.
pub fn today(now_utc: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    day_of(now_utc, offset)
}

pub fn day_of(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Midnight of `day` at `offset`, as a UTC instant. `None` at the edges of the calendar.
pub fn day_start(day: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local_midnight = day.and_time(NaiveTime::MIN);
    let utc_midnight = local_midnight
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
    Some(Utc.from_utc_datetime(&utc_midnight))
}

pub fn day_start_epoch(day: NaiveDate, offset: FixedOffset) -> Result<i64, StatsError> {
    day_start(day, offset)
        .map(|t| t.timestamp())
        .ok_or(StatsError::OutOfCalendar { day })
}

/// Half-open instant interval `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// `[start 00:00, end+1 00:00)` so the last day is fully included.
    pub fn for_range(range: &DateRange, offset: FixedOffset) -> Result<Self, StatsError> {
        let from = day_start(range.start(), offset).ok_or(StatsError::OutOfCalendar {
            day: range.start(),
        })?;
        let to = day_start(range.end(), offset)
            .and_then(|t| t.checked_add_signed(Duration::days(1)))
            .ok_or(StatsError::OutOfCalendar { day: range.end() })?;
        Ok(Self { from, to })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from <= ts && ts < self.to
    }
}
