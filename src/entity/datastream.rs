use serde::{Deserialize, Serialize};

use crate::ontology::Resolved;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasurement {
    pub name: String,
    pub symbol: String,
    /// Unit code URI, e.g. `http://purl.obolibrary.org/obo/UO_0000027`.
    pub definition: String,
}

/// One source property of a station and the remote entities created for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatastreamDef {
    pub source_property_id: String,
    #[serde(default)]
    pub source_units: Option<String>,
    pub canonical_label: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub unit_of_measure: Option<UnitOfMeasurement>,
    pub observation_type_uri: String,
    #[serde(default)]
    pub remote_sensor_link: Option<String>,
    #[serde(default)]
    pub remote_observed_property_link: Option<String>,
    #[serde(default)]
    pub remote_datastream_link: Option<String>,
}

impl DatastreamDef {
    #[must_use]
    pub fn new(source_property_id: &str, source_units: Option<String>, resolved: Resolved) -> Self {
        Self {
            source_property_id: source_property_id.to_string(),
            source_units,
            canonical_label: resolved.label,
            definition: resolved.definition,
            unit_of_measure: resolved.unit,
            observation_type_uri: resolved.observation_type_uri,
            remote_sensor_link: None,
            remote_observed_property_link: None,
            remote_datastream_link: None,
        }
    }

    /// Copy source-derived fields from `other`, leaving remote links untouched.
    pub fn refresh_from(&mut self, other: &Self) {
        self.source_units.clone_from(&other.source_units);
        self.canonical_label.clone_from(&other.canonical_label);
        self.definition.clone_from(&other.definition);
        self.unit_of_measure.clone_from(&other.unit_of_measure);
        self.observation_type_uri.clone_from(&other.observation_type_uri);
    }
}
