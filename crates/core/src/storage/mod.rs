use crate::domain::request::{DateField, RequestStatus, ServiceRequest};
use crate::domain::stats::{DailyCount, ServiceCount};
use crate::time::days::TimeWindow;
use anyhow::Context;
use chrono::{DateTime, FixedOffset, Utc};
use std::future::Future;
use std::time::Duration;

pub mod memory;
pub mod postgres;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("request store query failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::backend(err)
    }
}

/// Read-only queries over service requests.
///
/// Windows are half-open and always filter on `requested_datetime`.
/// `daily_counts` also requires `field` in the window and buckets on it.
#[async_trait::async_trait]
pub trait RequestStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Per-day counts of requests with `status` opened in `window` whose `field` also lies in
    /// `window`, bucketed by `field` with days cut at `offset`. Days without matches may be
    /// omitted.
    async fn daily_counts(
        &self,
        status: RequestStatus,
        field: DateField,
        window: TimeWindow,
        offset: FixedOffset,
    ) -> Result<Vec<DailyCount>, StoreError>;

    /// Request counts per `service_name` in `window`, in any order.
    async fn service_counts(&self, window: TimeWindow) -> Result<Vec<ServiceCount>, StoreError>;

    async fn requests_in(&self, window: TimeWindow) -> Result<Vec<ServiceRequest>, StoreError>;

    async fn count(
        &self,
        status: Option<RequestStatus>,
        window: Option<TimeWindow>,
    ) -> Result<i64, StoreError>;

    async fn latest_requested(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Mean of `updated - requested` over closed requests in `window`.
    async fn average_response(
        &self,
        window: TimeWindow,
    ) -> Result<Option<chrono::Duration>, StoreError>;
}

pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
