use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(alias = "open")]
    Open,
    #[serde(alias = "closed")]
    Closed,
}

impl RequestStatus {
    /// Value stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Open" | "open" => Ok(Self::Open),
            "Closed" | "closed" => Ok(Self::Closed),
            other => anyhow::bail!("unknown request status: {other:?}"),
        }
    }
}

/// A citizen service request as published by an Open311 GeoReport feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub service_request_id: String,
    pub status: RequestStatus,
    pub service_name: String,
    #[serde(default)]
    pub service_code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub long: Option<f64>,
    pub requested_datetime: DateTime<Utc>,
    #[serde(default)]
    pub updated_datetime: Option<DateTime<Utc>>,
}

/// Timestamp column a series is bucketed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Requested,
    Updated,
}

impl DateField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Requested => "requested_datetime",
            Self::Updated => "updated_datetime",
        }
    }

    pub fn of(self, request: &ServiceRequest) -> Option<DateTime<Utc>> {
        match self {
            Self::Requested => Some(request.requested_datetime),
            Self::Updated => request.updated_datetime,
        }
    }
}
