use crate::domain::request::ServiceRequest;
use crate::stats::breakdown::DayWindowQuery;
use crate::stats::error::StatsError;
use crate::stats::StatsOptions;
use crate::storage::{with_timeout, RequestStore};
use crate::time::days::TimeWindow;
use chrono::NaiveDate;

/// Raw requests opened within the `begin` / `end` window, oldest first.
pub async fn list_requests<S: RequestStore + ?Sized>(
    store: &S,
    opts: StatsOptions,
    query: &DayWindowQuery,
    today: NaiveDate,
) -> Result<Vec<ServiceRequest>, StatsError> {
    let (_, range) = query.resolve(today)?;
    let window = TimeWindow::for_range(&range, opts.utc_offset)?;
    let requests = with_timeout(opts.store_timeout, store.requests_in(window)).await?;
    Ok(requests)
}
