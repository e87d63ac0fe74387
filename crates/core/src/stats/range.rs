use crate::domain::stats::{DateRange, MAX_RANGE_DAYS};
use crate::stats::error::StatsError;
use crate::time::days::parse_day;
use chrono::{Days, NaiveDate};

/// Span used when neither `start` nor `end` nor `num_days` is given.
pub const DEFAULT_NUM_DAYS: u32 = 30;

/// Resolves the optional `start` / `end` / `num_days` parameters into a concrete day range.
///
/// Evaluated in priority order:
/// 1. no `start`, no `end`: the `num_days` (default 30) days ending `today`;
/// 2. `end` and `num_days`: the `num_days` days ending `end`, `start` is ignored;
/// 3. only `end`: that single day;
/// 4. `start` and `end`: taken verbatim;
/// 5. only `start`: from `start` through `today`.
///
/// Blank values count as absent.
pub fn resolve_date_range(
    start: Option<&str>,
    end: Option<&str>,
    num_days: Option<&str>,
    today: NaiveDate,
) -> Result<DateRange, StatsError> {
    let start = non_blank(start);
    let end = non_blank(end);
    let num_days = non_blank(num_days).map(parse_num_days).transpose()?;

    match (start, end, num_days) {
        (None, None, n) => span_ending(today, n.unwrap_or(DEFAULT_NUM_DAYS)),
        (_, Some(end), Some(n)) => span_ending(parse_day("end", end)?, n),
        (None, Some(end), None) => Ok(DateRange::single(parse_day("end", end)?)),
        (Some(start), Some(end), None) => {
            DateRange::new(parse_day("start", start)?, parse_day("end", end)?)
        }
        (Some(start), None, _) => DateRange::new(parse_day("start", start)?, today),
    }
}

pub fn parse_num_days(value: &str) -> Result<u32, StatsError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| StatsError::Parse {
            field: "num_days",
            value: value.to_string(),
        })
}

fn span_ending(end: NaiveDate, num_days: u32) -> Result<DateRange, StatsError> {
    if u64::from(num_days) > MAX_RANGE_DAYS {
        return Err(StatsError::RangeTooLong {
            days: u64::from(num_days),
            max: MAX_RANGE_DAYS,
        });
    }
    let start = end
        .checked_sub_days(Days::new(u64::from(num_days) - 1))
        .ok_or_else(|| StatsError::Parse {
            field: "num_days",
            value: num_days.to_string(),
        })?;
    DateRange::new(start, end)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
