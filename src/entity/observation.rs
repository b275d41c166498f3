use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single reading of one source property. The value stays as source text and
/// is coerced per observation type when uploaded.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub timestamp: DateTime<Utc>,
    pub source_property_id: String,
    pub value: String,
}

impl ObservationRecord {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, source_property_id: &str, value: &str) -> Self {
        Self {
            timestamp,
            source_property_id: source_property_id.to_string(),
            value: value.to_string(),
        }
    }

    /// Calendar day (UTC) used to partition the on-disk store.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
