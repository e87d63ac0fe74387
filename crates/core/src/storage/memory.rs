use crate::domain::request::{DateField, RequestStatus, ServiceRequest};
use crate::domain::stats::{DailyCount, ServiceCount};
use crate::storage::{RequestStore, StoreError};
use crate::time::days::{day_of, TimeWindow};
use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Store over a fixed set of requests held in memory, e.g. an Open311 JSON export.
#[derive(Debug, Clone, Default)]
pub struct MemoryRequestStore {
    requests: Vec<ServiceRequest>,
}

impl MemoryRequestStore {
    pub fn new(requests: Vec<ServiceRequest>) -> Self {
        Self { requests }
    }

    /// Loads a JSON array of Open311 service requests.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("invalid requests in {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let requests = serde_json::from_str::<Vec<ServiceRequest>>(text)
            .context("expected a JSON array of service requests")?;
        Ok(Self::new(requests))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn requested_in(&self, window: TimeWindow) -> impl Iterator<Item = &ServiceRequest> {
        self.requests
            .iter()
            .filter(move |r| window.contains(r.requested_datetime))
    }
}

#[async_trait::async_trait]
impl RequestStore for MemoryRequestStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn daily_counts(
        &self,
        status: RequestStatus,
        field: DateField,
        window: TimeWindow,
        offset: FixedOffset,
    ) -> Result<Vec<DailyCount>, StoreError> {
        let mut by_day = BTreeMap::<NaiveDate, i64>::new();
        for ts in self
            .requested_in(window)
            .filter(|r| r.status == status)
            .filter_map(|r| field.of(r))
            .filter(|ts| window.contains(*ts))
        {
            *by_day.entry(day_of(ts, offset)).or_default() += 1;
        }

        Ok(by_day
            .into_iter()
            .map(|(day, count)| DailyCount { day, count })
            .collect())
    }

    async fn service_counts(&self, window: TimeWindow) -> Result<Vec<ServiceCount>, StoreError> {
        let mut by_name = HashMap::<&str, i64>::new();
        for r in self.requested_in(window) {
            *by_name.entry(r.service_name.as_str()).or_default() += 1;
        }

        Ok(by_name
            .into_iter()
            .map(|(name, count)| ServiceCount {
                service_name: name.to_string(),
                count,
            })
            .collect())
    }

    async fn requests_in(&self, window: TimeWindow) -> Result<Vec<ServiceRequest>, StoreError> {
        let mut out: Vec<ServiceRequest> = self.requested_in(window).cloned().collect();
        out.sort_by(|a, b| {
            a.requested_datetime
                .cmp(&b.requested_datetime)
                .then_with(|| a.service_request_id.cmp(&b.service_request_id))
        });
        Ok(out)
    }

    async fn count(
        &self,
        status: Option<RequestStatus>,
        window: Option<TimeWindow>,
    ) -> Result<i64, StoreError> {
        let n = self
            .requests
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .filter(|r| window.map_or(true, |w| w.contains(r.requested_datetime)))
            .count();
        Ok(n as i64)
    }

    async fn latest_requested(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.requests.iter().map(|r| r.requested_datetime).max())
    }

    async fn average_response(
        &self,
        window: TimeWindow,
    ) -> Result<Option<chrono::Duration>, StoreError> {
        let elapsed: Vec<chrono::Duration> = self
            .requested_in(window)
            .filter(|r| r.status == RequestStatus::Closed)
            .filter_map(|r| r.updated_datetime.map(|u| u - r.requested_datetime))
            .collect();

        if elapsed.is_empty() {
            return Ok(None);
        }
        let total_ms: i64 = elapsed.iter().map(|d| d.num_milliseconds()).sum();
        Ok(Some(chrono::Duration::milliseconds(
            total_ms / elapsed.len() as i64,
        )))
    }
}
