use crate::domain::request::{DateField, RequestStatus, ServiceRequest};
use crate::domain::stats::{DailyCount, ServiceCount};
use crate::storage::{RequestStore, StoreError};
use crate::time::days::TimeWindow;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

type RequestRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

#[derive(Debug, Clone)]
pub struct PgRequestStore {
    pool: sqlx::PgPool,
}

impl PgRequestStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RequestStore for PgRequestStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn daily_counts(
        &self,
        status: RequestStatus,
        field: DateField,
        window: TimeWindow,
        offset: FixedOffset,
    ) -> Result<Vec<DailyCount>, StoreError> {
        // Column names come from a closed enum, never from input.
        let column = field.column();
        let sql = format!(
            "SELECT (({column} AT TIME ZONE 'UTC') + make_interval(secs => $4))::date AS day, \
                    COUNT(*) AS count \
             FROM service_requests \
             WHERE status = $1 \
               AND requested_datetime >= $2 AND requested_datetime < $3 \
               AND {column} >= $2 AND {column} < $3 \
             GROUP BY day \
             ORDER BY day ASC"
        );

        let t0 = std::time::Instant::now();
        let rows = sqlx::query_as::<_, (NaiveDate, i64)>(&sql)
            .persistent(false)
            .bind(status.as_str())
            .bind(window.from)
            .bind(window.to)
            .bind(f64::from(offset.local_minus_utc()))
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            %status,
            column,
            days = rows.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "daily_counts"
        );

        Ok(rows
            .into_iter()
            .map(|(day, count)| DailyCount { day, count })
            .collect())
    }

    async fn service_counts(&self, window: TimeWindow) -> Result<Vec<ServiceCount>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT service_name, COUNT(*) AS count \
             FROM service_requests \
             WHERE requested_datetime >= $1 AND requested_datetime < $2 \
             GROUP BY service_name \
             ORDER BY count DESC, service_name ASC",
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(service_name, count)| ServiceCount {
                service_name,
                count,
            })
            .collect())
    }

    async fn requests_in(&self, window: TimeWindow) -> Result<Vec<ServiceRequest>, StoreError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT service_request_id, status, service_name, service_code, description, \
                    address, lat, long, requested_datetime, updated_datetime \
             FROM service_requests \
             WHERE requested_datetime >= $1 AND requested_datetime < $2 \
             ORDER BY requested_datetime ASC, service_request_id ASC",
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (
            service_request_id,
            status,
            service_name,
            service_code,
            description,
            address,
            lat,
            long,
            requested_datetime,
            updated_datetime,
        ) in rows
        {
            let status = status.parse::<RequestStatus>().map_err(StoreError::backend)?;
            out.push(ServiceRequest {
                service_request_id,
                status,
                service_name,
                service_code,
                description,
                address,
                lat,
                long,
                requested_datetime,
                updated_datetime,
            });
        }
        Ok(out)
    }

    async fn count(
        &self,
        status: Option<RequestStatus>,
        window: Option<TimeWindow>,
    ) -> Result<i64, StoreError> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            "SELECT COUNT(*) FROM service_requests WHERE TRUE",
        );
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(window) = window {
            qb.push(" AND requested_datetime >= ")
                .push_bind(window.from)
                .push(" AND requested_datetime < ")
                .push_bind(window.to);
        }

        let n: i64 = qb
            .build_query_scalar::<i64>()
            .persistent(false)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn latest_requested(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let latest: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(requested_datetime) FROM service_requests")
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    async fn average_response(
        &self,
        window: TimeWindow,
    ) -> Result<Option<chrono::Duration>, StoreError> {
        let secs: Option<f64> = sqlx::query_scalar(
            "SELECT EXTRACT(EPOCH FROM AVG(updated_datetime - requested_datetime))::float8 \
             FROM service_requests \
             WHERE status = 'Closed' AND updated_datetime IS NOT NULL \
               AND requested_datetime >= $1 AND requested_datetime < $2",
        )
        .bind(window.from)
        .bind(window.to)
        .fetch_one(&self.pool)
        .await?;

        Ok(secs.map(|s| chrono::Duration::milliseconds((s * 1000.0).round() as i64)))
    }
}
