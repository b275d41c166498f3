use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use crate::common::time::{parse_iso8601, to_iso8601};
use crate::error::{AppError, AppResult};

/// Time selection for an observation upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationWindow {
    /// `start/end`, start inclusive, end exclusive.
    Interval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Exactly one timestamp.
    Instant(DateTime<Utc>),
    /// The most recent timestamp present in the cache.
    Latest,
}

impl ObservationWindow {
    /// Parse `latest`, an ISO-8601 instant, or an ISO-8601 `start/end` interval.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timestamp` if a bound does not parse, and
    /// `AppError::InvalidArgument` if the interval ends before it starts.
    pub fn parse(value: &str) -> AppResult<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }

        match value.split_once('/') {
            Some((start, end)) => {
                let start = parse_iso8601(start)?;
                let end = parse_iso8601(end)?;
                if end < start {
                    return Err(AppError::InvalidArgument(format!(
                        "interval `{value}` ends before it starts"
                    )));
                }
                Ok(Self::Interval { start, end })
            }
            None => Ok(Self::Instant(parse_iso8601(value)?)),
        }
    }

    /// Whether `timestamp` falls in the window. `Latest` must be resolved first
    /// and never matches.
    #[must_use]
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        match self {
            Self::Interval { start, end } => start <= timestamp && timestamp < end,
            Self::Instant(instant) => instant == timestamp,
            Self::Latest => false,
        }
    }

    /// UTC days whose partitions may hold matching records, inclusive.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Self::Interval { start, end } => Some((start.date_naive(), end.date_naive())),
            Self::Instant(instant) => Some((instant.date_naive(), instant.date_naive())),
            Self::Latest => None,
        }
    }
}

impl FromStr for ObservationWindow {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ObservationWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interval { start, end } => {
                write!(f, "{}/{}", to_iso8601(start), to_iso8601(end))
            }
            Self::Instant(instant) => f.write_str(&to_iso8601(instant)),
            Self::Latest => f.write_str("latest"),
        }
    }
}
