use crate::domain::request::{DateField, RequestStatus};
use crate::domain::stats::{DailyCount, DailyOpenClosed, DateRange, StatusMode, TimeSeries};
use crate::stats::error::StatsError;
use crate::stats::range::resolve_date_range;
use crate::stats::StatsOptions;
use crate::storage::{with_timeout, RequestStore};
use crate::time::days::TimeWindow;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

/// Raw `/api/tickets/days` parameters. Kept as strings so that parse failures are ours to report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSeriesQuery {
    pub status: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub num_days: Option<String>,
}

impl TimeSeriesQuery {
    pub fn mode(&self) -> Result<StatusMode, StatsError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(StatusMode::default()),
            Some(s) => s.parse(),
        }
    }

    pub fn range(&self, today: NaiveDate) -> Result<DateRange, StatsError> {
        resolve_date_range(
            self.start.as_deref(),
            self.end.as_deref(),
            self.num_days.as_deref(),
            today,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSeries {
    pub mode: StatusMode,
    pub range: DateRange,
    pub series: TimeSeries,
}

pub struct TimeSeriesStatsResolver<'a, S: ?Sized> {
    store: &'a S,
    opts: StatsOptions,
}

impl<'a, S: RequestStore + ?Sized> TimeSeriesStatsResolver<'a, S> {
    pub fn new(store: &'a S, opts: StatsOptions) -> Self {
        Self { store, opts }
    }

    pub async fn resolve(
        &self,
        query: &TimeSeriesQuery,
        today: NaiveDate,
    ) -> Result<ResolvedSeries, StatsError> {
        let mode = query.mode()?;
        let range = query.range(today)?;

        tracing::debug!(
            ?mode,
            start = %range.start(),
            end = %range.end(),
            backend = self.store.backend_name(),
            "resolving ticket time series"
        );

        let series = self.series(mode, &range).await?;
        Ok(ResolvedSeries {
            mode,
            range,
            series,
        })
    }

    pub async fn series(
        &self,
        mode: StatusMode,
        range: &DateRange,
    ) -> Result<TimeSeries, StatsError> {
        match mode {
            StatusMode::Open => Ok(TimeSeries::Open(self.opened(range).await?)),
            StatusMode::Closed => Ok(TimeSeries::Closed(self.closed(range).await?)),
            StatusMode::Both => {
                let opened = self.opened(range).await?;
                let closed = self.closed(range).await?;
                Ok(TimeSeries::Both(join_by_day(opened, closed)?))
            }
        }
    }

    async fn opened(&self, range: &DateRange) -> Result<Vec<DailyCount>, StatsError> {
        self.daily(RequestStatus::Open, DateField::Requested, range).await
    }

    /// Closed requests opened within the range, bucketed by the day they were closed.
    async fn closed(&self, range: &DateRange) -> Result<Vec<DailyCount>, StatsError> {
        self.daily(RequestStatus::Closed, DateField::Updated, range).await
    }

    async fn daily(
        &self,
        status: RequestStatus,
        field: DateField,
        range: &DateRange,
    ) -> Result<Vec<DailyCount>, StatsError> {
        let offset = self.opts.utc_offset;
        let window = TimeWindow::for_range(range, offset)?;
        let sparse = with_timeout(
            self.opts.store_timeout,
            self.store.daily_counts(status, field, window, offset),
        )
        .await?;
        Ok(zero_fill(range, sparse))
    }
}

/// One entry per day of `range`; days missing from `sparse` count zero, days outside are dropped.
pub fn zero_fill(range: &DateRange, sparse: Vec<DailyCount>) -> Vec<DailyCount> {
    let mut by_day = HashMap::<NaiveDate, i64>::with_capacity(sparse.len());
    for p in sparse {
        *by_day.entry(p.day).or_default() += p.count;
    }

    range
        .days()
        .map(|day| DailyCount {
            day,
            count: by_day.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

/// Pairs two zero-filled series day by day. Both must cover exactly the same days.
pub fn join_by_day(
    opened: Vec<DailyCount>,
    closed: Vec<DailyCount>,
) -> Result<Vec<DailyOpenClosed>, StatsError> {
    let n = opened.len().min(closed.len());
    if let Some(extra) = opened.get(n).or_else(|| closed.get(n)) {
        return Err(StatsError::Misaligned { day: extra.day });
    }

    opened
        .into_iter()
        .zip(closed)
        .map(|(o, c)| {
            if o.day != c.day {
                return Err(StatsError::Misaligned { day: o.day });
            }
            Ok(DailyOpenClosed {
                day: o.day,
                open_count: o.count,
                closed_count: c.count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::ServiceRequest;
    use crate::domain::stats::TimeSeriesPoint;
    use crate::storage::memory::MemoryRequestStore;
    use crate::storage::StoreError;
    use crate::time::days::TimeWindow;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};
    use std::time::Duration;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, day, hour, 0, 0).unwrap()
    }

    fn request(
        id: usize,
        status: RequestStatus,
        requested: DateTime<Utc>,
        updated: Option<DateTime<Utc>>,
    ) -> ServiceRequest {
        ServiceRequest {
            service_request_id: id.to_string(),
            status,
            service_name: "Pothole".to_string(),
            service_code: None,
            description: None,
            address: None,
            lat: None,
            long: None,
            requested_datetime: requested,
            updated_datetime: updated,
        }
    }

    /// Three opened and two closed on 2020-06-01, nothing on 2020-06-02.
    fn fixture() -> MemoryRequestStore {
        let mut requests = Vec::new();
        for i in 0..3 {
            requests.push(request(i, RequestStatus::Open, at(1, 9 + i as u32), None));
        }
        for i in 3..5 {
            requests.push(request(
                i,
                RequestStatus::Closed,
                at(1, 1),
                Some(at(1, 12 + i as u32)),
            ));
        }
        MemoryRequestStore::new(requests)
    }

    fn query(status: &str, start: &str, end: &str) -> TimeSeriesQuery {
        TimeSeriesQuery {
            status: Some(status.to_string()),
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            num_days: None,
        }
    }

    #[tokio::test]
    async fn both_mode_pairs_independent_counts() {
        let store = fixture();
        let resolver = TimeSeriesStatsResolver::new(&store, StatsOptions::default());

        let out = resolver
            .resolve(&query("both", "2020-06-01", "2020-06-02"), d("2020-07-01"))
            .await
            .unwrap();

        assert_eq!(out.mode, StatusMode::Both);
        assert_eq!(
            out.series,
            TimeSeries::Both(vec![
                DailyOpenClosed {
                    day: d("2020-06-01"),
                    open_count: 3,
                    closed_count: 2,
                },
                DailyOpenClosed {
                    day: d("2020-06-02"),
                    open_count: 0,
                    closed_count: 0,
                },
            ])
        );
    }

    #[tokio::test]
    async fn closed_series_is_keyed_by_update_day() {
        let store = MemoryRequestStore::new(vec![request(
            1,
            RequestStatus::Closed,
            at(1, 8),
            Some(at(3, 8)),
        )]);
        let resolver = TimeSeriesStatsResolver::new(&store, StatsOptions::default());

        let out = resolver
            .resolve(&query("closed", "2020-06-01", "2020-06-03"), d("2020-07-01"))
            .await
            .unwrap();

        let counts: Vec<i64> = match out.series {
            TimeSeries::Closed(v) => v.into_iter().map(|p| p.count).collect(),
            other => panic!("unexpected series {other:?}"),
        };
        assert_eq!(counts, vec![0, 0, 1]);
    }

    #[tokio::test]
    async fn closed_series_only_counts_requests_opened_in_range() {
        let store = MemoryRequestStore::new(vec![
            request(
                1,
                RequestStatus::Closed,
                at(1, 8) - chrono::Duration::days(31),
                Some(at(2, 8)),
            ),
            request(2, RequestStatus::Closed, at(1, 8), Some(at(3, 8))),
        ]);
        let resolver = TimeSeriesStatsResolver::new(&store, StatsOptions::default());

        let out = resolver
            .resolve(&query("closed", "2020-06-01", "2020-06-03"), d("2020-07-01"))
            .await
            .unwrap();

        let TimeSeries::Closed(points) = out.series else {
            panic!("expected closed series");
        };
        let counts: Vec<i64> = points.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![0, 0, 1]);
    }

    #[tokio::test]
    async fn default_query_is_thirty_zero_filled_open_days() {
        let store = fixture();
        let resolver = TimeSeriesStatsResolver::new(&store, StatsOptions::default());

        let out = resolver
            .resolve(&TimeSeriesQuery::default(), d("2020-06-15"))
            .await
            .unwrap();

        assert_eq!(out.mode, StatusMode::Open);
        assert_eq!(out.series.len(), 30);
        let TimeSeries::Open(points) = &out.series else {
            panic!("expected open series");
        };
        assert_eq!(points[0].day, d("2020-05-17"));
        assert_eq!(points.iter().map(|p| p.count).sum::<i64>(), 3);
        assert!(points
            .windows(2)
            .all(|w| (w[1].day - w[0].day).num_days() == 1));
    }

    #[tokio::test]
    async fn same_explicit_range_resolves_identically() {
        let store = fixture();
        let resolver = TimeSeriesStatsResolver::new(&store, StatsOptions::default());
        let q = query("both", "2020-05-30", "2020-06-04");

        let a = resolver.resolve(&q, d("2020-07-01")).await.unwrap();
        let b = resolver.resolve(&q, d("2021-01-01")).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn day_boundaries_follow_the_reporting_offset() {
        // 2020-06-02 03:00 UTC is 2020-06-01 22:00 at UTC-5.
        let store = MemoryRequestStore::new(vec![request(1, RequestStatus::Open, at(2, 3), None)]);
        let opts = StatsOptions {
            utc_offset: FixedOffset::west_opt(5 * 3600).unwrap(),
            ..StatsOptions::default()
        };
        let resolver = TimeSeriesStatsResolver::new(&store, opts);

        let out = resolver
            .resolve(&query("open", "2020-06-01", "2020-06-02"), d("2020-07-01"))
            .await
            .unwrap();
        let points = out.series.to_points(opts.utc_offset).unwrap();

        assert_eq!(
            points[0],
            TimeSeriesPoint::Count {
                date: 1_590_987_600,
                count: 1
            }
        );
        assert_eq!(
            points[1],
            TimeSeriesPoint::Count {
                date: 1_591_074_000,
                count: 0
            }
        );
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected_before_querying() {
        let store = fixture();
        let resolver = TimeSeriesStatsResolver::new(&store, StatsOptions::default());
        let err = resolver
            .resolve(&query("pending", "2020-06-01", "2020-06-02"), d("2020-07-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::InvalidMode(ref m) if m == "pending"));
        assert!(err.is_client_error());
    }

    struct SlowStore;

    #[async_trait::async_trait]
    impl RequestStore for SlowStore {
        fn backend_name(&self) -> &'static str {
            "slow"
        }

        async fn daily_counts(
            &self,
            _status: RequestStatus,
            _field: DateField,
            _window: TimeWindow,
            _offset: FixedOffset,
        ) -> Result<Vec<DailyCount>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn service_counts(
            &self,
            _window: TimeWindow,
        ) -> Result<Vec<crate::domain::stats::ServiceCount>, StoreError> {
            Ok(Vec::new())
        }

        async fn requests_in(
            &self,
            _window: TimeWindow,
        ) -> Result<Vec<ServiceRequest>, StoreError> {
            Ok(Vec::new())
        }

        async fn count(
            &self,
            _status: Option<RequestStatus>,
            _window: Option<TimeWindow>,
        ) -> Result<i64, StoreError> {
            Ok(0)
        }

        async fn latest_requested(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
            Ok(None)
        }

        async fn average_response(
            &self,
            _window: TimeWindow,
        ) -> Result<Option<chrono::Duration>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn slow_store_calls_time_out() {
        let opts = StatsOptions {
            store_timeout: Duration::from_millis(20),
            ..StatsOptions::default()
        };
        let resolver = TimeSeriesStatsResolver::new(&SlowStore, opts);
        let err = resolver
            .resolve(&TimeSeriesQuery::default(), d("2020-06-15"))
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::Store(StoreError::Timeout(_))));
        assert!(!err.is_client_error());
    }

    #[test]
    fn zero_fill_drops_days_outside_the_range() {
        let range = DateRange::new(d("2020-06-01"), d("2020-06-03")).unwrap();
        let filled = zero_fill(
            &range,
            vec![
                DailyCount {
                    day: d("2020-05-31"),
                    count: 9,
                },
                DailyCount {
                    day: d("2020-06-02"),
                    count: 4,
                },
            ],
        );
        let counts: Vec<i64> = filled.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![0, 4, 0]);
    }

    #[test]
    fn join_by_day_rejects_shifted_series() {
        let opened = vec![DailyCount {
            day: d("2020-06-01"),
            count: 1,
        }];
        let closed = vec![DailyCount {
            day: d("2020-06-02"),
            count: 1,
        }];
        let err = join_by_day(opened, closed).unwrap_err();
        assert!(matches!(err, StatsError::Misaligned { day } if day == d("2020-06-01")));

        let opened = vec![
            DailyCount {
                day: d("2020-06-01"),
                count: 1,
            },
            DailyCount {
                day: d("2020-06-02"),
                count: 1,
            },
        ];
        let closed = vec![DailyCount {
            day: d("2020-06-01"),
            count: 1,
        }];
        let err = join_by_day(opened, closed).unwrap_err();
        assert!(matches!(err, StatsError::Misaligned { day } if day == d("2020-06-02")));
    }
}
