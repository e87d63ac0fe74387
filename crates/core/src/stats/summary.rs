use crate::domain::request::RequestStatus;
use crate::domain::stats::WeeklySummary;
use crate::stats::error::StatsError;
use crate::stats::StatsOptions;
use crate::storage::{with_timeout, RequestStore};
use crate::time::days::TimeWindow;
use chrono::{DateTime, Duration, Utc};

/// Delta reported when the previous period has nothing to compare against.
pub const NO_BASELINE_DELTA: i64 = 100;

/// Percentage change from `previous` to `current`, rounded. Falls back to
/// [`NO_BASELINE_DELTA`] when `previous` is zero.
pub fn percent_delta(current: i64, previous: i64) -> i64 {
    if previous == 0 {
        return NO_BASELINE_DELTA;
    }
    (((current as f64 / previous as f64) - 1.0) * 100.0).round() as i64
}

/// Week-over-week figures anchored at the most recent request. `None` when the store is empty.
pub async fn weekly_summary<S: RequestStore + ?Sized>(
    store: &S,
    opts: StatsOptions,
) -> Result<Option<WeeklySummary>, StatsError> {
    let limit = opts.store_timeout;

    let Some(latest) = with_timeout(limit, store.latest_requested()).await? else {
        return Ok(None);
    };
    let (this_week, last_week) = week_windows(latest)?;

    let open_tickets = with_timeout(limit, store.count(Some(RequestStatus::Open), None)).await?;

    let this_week_created = with_timeout(limit, store.count(None, Some(this_week))).await?;
    let last_week_created = with_timeout(limit, store.count(None, Some(last_week))).await?;

    let closed = Some(RequestStatus::Closed);
    let this_week_closed = with_timeout(limit, store.count(closed, Some(this_week))).await?;
    let last_week_closed = with_timeout(limit, store.count(closed, Some(last_week))).await?;

    let this_week_time = with_timeout(limit, store.average_response(this_week))
        .await?
        .map(|d| d.num_days());
    let last_week_time = with_timeout(limit, store.average_response(last_week))
        .await?
        .map(|d| d.num_days());

    let delta_time = match (this_week_time, last_week_time) {
        (Some(current), Some(previous)) => percent_delta(current, previous),
        _ => NO_BASELINE_DELTA,
    };

    tracing::debug!(%latest, this_week_created, last_week_created, "weekly summary");

    Ok(Some(WeeklySummary {
        open_tickets,
        latest,
        this_week_created_count: this_week_created,
        delta_created_count: percent_delta(this_week_created, last_week_created),
        this_week_closed_count: this_week_closed,
        delta_closed_count: percent_delta(this_week_closed, last_week_closed),
        this_week_time,
        delta_time,
    }))
}

/// `[latest - 7d, latest]` and `[latest - 14d, latest - 7d)`.
fn week_windows(latest: DateTime<Utc>) -> Result<(TimeWindow, TimeWindow), StatsError> {
    let out_of_calendar = || StatsError::OutOfCalendar {
        day: latest.date_naive(),
    };
    let week_ago = latest
        .checked_sub_signed(Duration::days(7))
        .ok_or_else(out_of_calendar)?;
    let two_weeks_ago = latest
        .checked_sub_signed(Duration::days(14))
        .ok_or_else(out_of_calendar)?;
    // Postgres timestamps resolve to the microsecond; this keeps `latest` itself inside.
    let through_latest = latest
        .checked_add_signed(Duration::microseconds(1))
        .ok_or_else(out_of_calendar)?;

    Ok((
        TimeWindow {
            from: week_ago,
            to: through_latest,
        },
        TimeWindow {
            from: two_weeks_ago,
            to: week_ago,
        },
    ))
}
