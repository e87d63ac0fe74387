use crate::domain::stats::{DateRange, ServiceCount};
use crate::stats::error::StatsError;
use crate::stats::StatsOptions;
use crate::storage::{with_timeout, RequestStore};
use crate::time::days::{parse_day, TimeWindow, DAY_FORMAT};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

/// `begin` / `end` day parameters shared by the per-category and listing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayWindowQuery {
    pub begin: Option<String>,
    pub end: Option<String>,
}

impl DayWindowQuery {
    /// Response key: `begin`, or `begin - end` when an end day was given. `begin` defaults to
    /// `today`.
    pub fn resolve(&self, today: NaiveDate) -> Result<(String, DateRange), StatsError> {
        let begin_str = match self.begin.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => today.format(DAY_FORMAT).to_string(),
        };
        let begin = parse_day("begin", &begin_str)?;

        match self.end.as_deref().map(str::trim) {
            Some(end_str) if !end_str.is_empty() => {
                let end = parse_day("end", end_str)?;
                let range = DateRange::new(begin, end)?;
                Ok((format!("{begin_str} - {end_str}"), range))
            }
            _ => Ok((begin_str, DateRange::single(begin))),
        }
    }
}

/// Requests per category over the window, most frequent first.
pub async fn service_breakdown<S: RequestStore + ?Sized>(
    store: &S,
    opts: StatsOptions,
    query: &DayWindowQuery,
    today: NaiveDate,
) -> Result<BTreeMap<String, Vec<ServiceCount>>, StatsError> {
    let (key, range) = query.resolve(today)?;
    let window = TimeWindow::for_range(&range, opts.utc_offset)?;

    let mut counts = with_timeout(opts.store_timeout, store.service_counts(window)).await?;
    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.service_name.cmp(&b.service_name))
    });

    tracing::debug!(%key, categories = counts.len(), "service breakdown");

    Ok(BTreeMap::from([(key, counts)]))
}
