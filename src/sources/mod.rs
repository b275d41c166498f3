//! Decoders for the three station sources.
//!
//! Decoders are pure: bytes in, structured rows out. Fetching and caching is the
//! station's job.

pub mod hobo;
pub mod swob;
pub mod toa5;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::entity::ObservationRecord;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Source {
    EnvironmentCanada,
    DataGarrison,
    CampbellScientific,
}

impl Source {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnvironmentCanada => "environment_canada",
            Self::DataGarrison => "data_garrison",
            Self::CampbellScientific => "campbell_scientific",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "environment_canada" => Ok(Self::EnvironmentCanada),
            "data_garrison" => Ok(Self::DataGarrison),
            "campbell_scientific" => Ok(Self::CampbellScientific),
            other => Err(AppError::InvalidArgument(format!("invalid source '{other}'"))),
        }
    }
}

/// A property as the source describes it, before ontology mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub id: String,
    pub units: Option<String>,
}

/// Station description extracted from a source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub timezone_offset: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub property_defs: Vec<PropertyDef>,
}

/// Row-oriented table with a known set of column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowTable {
    /// Turn each non-empty cell into an observation.
    ///
    /// `time_column` holds the timestamp; `ignored` columns are skipped. Rows
    /// whose width does not match the header (a truncated last line, a stray
    /// partial record at the start of a ranged body) are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Propagates the first timestamp error from `parse_time`.
    pub fn observations<F>(
        &self,
        time_column: usize,
        ignored: &[usize],
        parse_time: F,
    ) -> AppResult<Vec<ObservationRecord>>
    where
        F: Fn(&str) -> AppResult<DateTime<Utc>>,
    {
        let mut observations = Vec::new();

        for row in &self.rows {
            if row.len() != self.columns.len() {
                tracing::warn!(
                    expected = self.columns.len(),
                    found = row.len(),
                    "Skipping malformed row"
                );
                continue;
            }

            let timestamp = parse_time(&row[time_column])?;

            for (index, (column, value)) in self.columns.iter().zip(row).enumerate() {
                if index == time_column || ignored.contains(&index) || is_missing(value) {
                    continue;
                }
                observations.push(ObservationRecord::new(timestamp, column, value.trim()));
            }
        }

        Ok(observations)
    }
}

fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value == "MSNG"
}
