//! Mapping of source property keys onto canonical observed properties.
//!
//! Each source ships a JSON table keyed by the source's own property id. Ids
//! missing from the table still synchronize, as generic `OM_Observation`
//! datastreams labelled with the raw id.

use serde::Deserialize;
use serde_json::{Number, Value};
use std::collections::HashMap;

use crate::entity::UnitOfMeasurement;
use crate::error::{AppError, AppResult};
use crate::sources::Source;

pub const OM_MEASUREMENT: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement";
pub const OM_COUNT_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_CountObservation";
pub const OM_OBSERVATION: &str =
    "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Observation";

const ENVIRONMENT_CANADA: &str = include_str!("environment_canada.json");
const CAMPBELL_SCIENTIFIC: &str = include_str!("campbell_scientific.json");
const DATA_GARRISON: &str = include_str!("data_garrison.json");

#[derive(Debug, Clone, Deserialize)]
struct OntologyEntry {
    label: String,
    #[serde(default)]
    definition: Option<String>,
    #[serde(default)]
    unit: Option<UnitOfMeasurement>,
    #[serde(default)]
    observation_type: Option<String>,
}

/// Canonical description of one source property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub label: String,
    pub definition: Option<String>,
    pub unit: Option<UnitOfMeasurement>,
    pub observation_type_uri: String,
}

#[derive(Debug, Clone, Default)]
pub struct Ontology {
    entries: HashMap<String, OntologyEntry>,
}

impl Ontology {
    /// Load the embedded table for `source`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Json` if the embedded table is malformed.
    pub fn for_source(source: Source) -> AppResult<Self> {
        let table = match source {
            Source::EnvironmentCanada => ENVIRONMENT_CANADA,
            Source::CampbellScientific => CAMPBELL_SCIENTIFIC,
            Source::DataGarrison => DATA_GARRISON,
        };
        Self::from_json(table)
    }

    /// # Errors
    ///
    /// Returns `AppError::Json` if `json` is not an object of ontology entries.
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }

    #[must_use]
    pub fn contains(&self, source_property_id: &str) -> bool {
        self.entries.contains_key(source_property_id)
    }

    #[must_use]
    pub fn resolve(&self, source_property_id: &str) -> Resolved {
        match self.entries.get(source_property_id) {
            Some(entry) => Resolved {
                label: entry.label.clone(),
                definition: entry.definition.clone(),
                unit: entry.unit.clone(),
                observation_type_uri: entry
                    .observation_type
                    .clone()
                    .unwrap_or_else(|| OM_OBSERVATION.to_string()),
            },
            None => Resolved {
                label: source_property_id.to_string(),
                definition: None,
                unit: None,
                observation_type_uri: OM_OBSERVATION.to_string(),
            },
        }
    }
}

/// Convert a raw source value into the JSON type implied by the observation type.
///
/// Measurements become floats, counts become integers, anything else stays text.
///
/// # Errors
///
/// Returns `AppError::Parse` if a measurement or count value is not numeric.
pub fn coerce(value: &str, observation_type_uri: &str) -> AppResult<Value> {
    let trimmed = value.trim();
    match observation_type_uri {
        OM_MEASUREMENT => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| AppError::Parse(format!("`{value}` is not a measurement"))),
        OM_COUNT_OBSERVATION => trimmed
            .parse::<i64>()
            .ok()
            .or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
            .map(|i| Value::Number(i.into()))
            .ok_or_else(|| AppError::Parse(format!("`{value}` is not a count"))),
        _ => Ok(Value::String(value.to_string())),
    }
}
