use crate::config::Settings;
use chrono::FixedOffset;
use std::time::Duration;

pub mod breakdown;
pub mod error;
pub mod listing;
pub mod range;
pub mod summary;
pub mod timeseries;

/// Knobs shared by every statistics query.
#[derive(Debug, Clone, Copy)]
pub struct StatsOptions {
    pub utc_offset: FixedOffset,
    pub store_timeout: Duration,
}

impl From<&Settings> for StatsOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            utc_offset: settings.utc_offset,
            store_timeout: settings.store_timeout,
        }
    }
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}
