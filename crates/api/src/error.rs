use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashboard_core::stats::error::StatsError;
use dashboard_core::storage::StoreError;

/// Error returned by data endpoints, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Started without a reachable database.
    Unavailable,
    NotFound(&'static str),
    Stats(StatsError),
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        Self::Stats(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Stats(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Stats(StatsError::Store(StoreError::Timeout(_))) => StatusCode::GATEWAY_TIMEOUT,
            Self::Stats(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Unavailable => "request store unavailable".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Stats(e) => e.to_string(),
        };

        if let Self::Stats(e) = &self {
            if status.is_server_error() {
                let err = anyhow::anyhow!("{e:#}");
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %e, %status, "stats query failed");
            } else {
                tracing::debug!(error = %e, "rejected stats query");
            }
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
