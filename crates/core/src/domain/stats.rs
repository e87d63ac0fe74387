use crate::stats::error::StatsError;
use crate::time::days::day_start_epoch;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest range a single query may ask for, about ten years.
pub const MAX_RANGE_DAYS: u64 = 3660;

/// Inclusive range of calendar days. `start <= end` and the span is at most
/// [`MAX_RANGE_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, StatsError> {
        if end < start {
            return Err(StatsError::InvalidRange { start, end });
        }
        let days = (end - start).num_days().unsigned_abs() + 1;
        if days > MAX_RANGE_DAYS {
            return Err(StatsError::RangeTooLong {
                days,
                max: MAX_RANGE_DAYS,
            });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn num_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.num_days())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMode {
    #[default]
    Open,
    Closed,
    Both,
}

impl FromStr for StatusMode {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "both" => Ok(Self::Both),
            other => Err(StatsError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyOpenClosed {
    pub day: NaiveDate,
    pub open_count: i64,
    pub closed_count: i64,
}

/// Zero-filled per-day counts, one entry per day of the resolved range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeSeries {
    Open(Vec<DailyCount>),
    Closed(Vec<DailyCount>),
    Both(Vec<DailyOpenClosed>),
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        match self {
            Self::Open(v) | Self::Closed(v) => v.len(),
            Self::Both(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wire form; each day is stamped with the epoch seconds of its midnight at `offset`.
    pub fn to_points(&self, offset: FixedOffset) -> Result<Vec<TimeSeriesPoint>, StatsError> {
        match self {
            Self::Open(v) | Self::Closed(v) => v
                .iter()
                .map(|p| {
                    Ok(TimeSeriesPoint::Count {
                        date: day_start_epoch(p.day, offset)?,
                        count: p.count,
                    })
                })
                .collect(),
            Self::Both(v) => v
                .iter()
                .map(|p| {
                    Ok(TimeSeriesPoint::OpenClosed {
                        date: day_start_epoch(p.day, offset)?,
                        open_count: p.open_count,
                        closed_count: p.closed_count,
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TimeSeriesPoint {
    Count {
        date: i64,
        count: i64,
    },
    OpenClosed {
        date: i64,
        open_count: i64,
        closed_count: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCount {
    pub service_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySummary {
    pub open_tickets: i64,
    pub latest: DateTime<Utc>,
    pub this_week_created_count: i64,
    pub delta_created_count: i64,
    pub this_week_closed_count: i64,
    pub delta_closed_count: i64,
    /// Average whole days from request to close; absent when nothing closed this week.
    pub this_week_time: Option<i64>,
    pub delta_time: i64,
}
