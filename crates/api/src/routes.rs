use crate::error::ApiError;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use dashboard_core::domain::request::ServiceRequest;
use dashboard_core::domain::stats::{ServiceCount, TimeSeriesPoint, WeeklySummary};
use dashboard_core::stats::breakdown::{service_breakdown, DayWindowQuery};
use dashboard_core::stats::listing::list_requests;
use dashboard_core::stats::summary::weekly_summary;
use dashboard_core::stats::timeseries::{TimeSeriesQuery, TimeSeriesStatsResolver};
use dashboard_core::stats::StatsOptions;
use dashboard_core::storage::RequestStore;
use dashboard_core::time::days::today;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Option<Arc<dyn RequestStore>>,
    pub opts: StatsOptions,
}

impl AppState {
    fn store(&self) -> Result<&dyn RequestStore, ApiError> {
        self.store.as_deref().ok_or(ApiError::Unavailable)
    }

    fn today(&self) -> NaiveDate {
        today(Utc::now(), self.opts.utc_offset)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/tickets/days", get(ticket_days))
        .route("/api/tickets/day", get(ticket_day))
        .route("/api/requests", get(requests))
        .route("/api/summary", get(summary))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ticket_days(
    State(state): State<AppState>,
    Query(query): Query<TimeSeriesQuery>,
) -> Result<Json<Vec<TimeSeriesPoint>>, ApiError> {
    let store = state.store()?;
    let resolved = TimeSeriesStatsResolver::new(store, state.opts)
        .resolve(&query, state.today())
        .await?;

    Ok(Json(resolved.series.to_points(state.opts.utc_offset)?))
}

async fn ticket_day(
    State(state): State<AppState>,
    Query(query): Query<DayWindowQuery>,
) -> Result<Json<BTreeMap<String, Vec<ServiceCount>>>, ApiError> {
    let store = state.store()?;
    let out = service_breakdown(store, state.opts, &query, state.today()).await?;
    Ok(Json(out))
}

async fn requests(
    State(state): State<AppState>,
    Query(query): Query<DayWindowQuery>,
) -> Result<Json<Vec<ServiceRequest>>, ApiError> {
    let store = state.store()?;
    let out = list_requests(store, state.opts, &query, state.today()).await?;
    Ok(Json(out))
}

async fn summary(State(state): State<AppState>) -> Result<Json<WeeklySummary>, ApiError> {
    let store = state.store()?;
    weekly_summary(store, state.opts)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("summary"))
}
