pub mod domain;
pub mod stats;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use chrono::{FixedOffset, Offset, Utc};
    use std::time::Duration;

    const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        /// Offset used to cut timestamps into calendar days.
        pub utc_offset: FixedOffset,
        pub store_timeout: Duration,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let utc_offset = match std::env::var("DASHBOARD_UTC_OFFSET_HOURS") {
                Ok(s) => parse_utc_offset(&s)?,
                Err(_) => utc(),
            };

            let store_timeout_secs = match std::env::var("STORE_TIMEOUT_SECS") {
                Ok(s) => s
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("STORE_TIMEOUT_SECS must be an integer (got {s:?})"))?,
                Err(_) => DEFAULT_STORE_TIMEOUT_SECS,
            };
            anyhow::ensure!(store_timeout_secs >= 1, "STORE_TIMEOUT_SECS must be >= 1");

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                utc_offset,
                store_timeout: Duration::from_secs(store_timeout_secs),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                database_url: None,
                sentry_dsn: None,
                utc_offset: utc(),
                store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            }
        }
    }

    pub fn parse_utc_offset(s: &str) -> anyhow::Result<FixedOffset> {
        let hours = s.trim().parse::<i32>().with_context(|| {
            format!("DASHBOARD_UTC_OFFSET_HOURS must be an integer (got {s:?})")
        })?;
        anyhow::ensure!(
            (-23..=23).contains(&hours),
            "DASHBOARD_UTC_OFFSET_HOURS must be -23..=23 (got {hours})"
        );
        FixedOffset::east_opt(hours * 3600).context("invalid UTC offset")
    }

    fn utc() -> FixedOffset {
        Utc.fix()
    }

}
