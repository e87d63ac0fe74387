use crate::storage::StoreError;
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("cannot parse {field} from {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("unknown status {0:?} (expected open, closed or both)")]
    InvalidMode(String),

    #[error("end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("range of {days} days exceeds the {max} day limit")]
    RangeTooLong { days: u64, max: u64 },

    #[error("{day} is outside the supported calendar")]
    OutOfCalendar { day: NaiveDate },

    #[error("open and closed series are not aligned at {day}")]
    Misaligned { day: NaiveDate },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StatsError {
    /// True when the caller sent bad input, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::InvalidMode(_)
                | Self::InvalidRange { .. }
                | Self::RangeTooLong { .. }
                | Self::OutOfCalendar { .. }
        )
    }
}
