use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::DatastreamDef;

/// Cached description of a station plus the remote entities created for it.
///
/// Remote links are only ever added. A populated link means the entity exists
/// on the SensorThings server and must be reused.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StationMetadata {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Offset applied to zone-less logger timestamps, e.g. `-06:00`.
    #[serde(default)]
    pub timezone_offset: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Source data files, for stations that publish more than one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_urls: Vec<String>,
    #[serde(default)]
    pub remote_thing_link: Option<String>,
    #[serde(default)]
    pub remote_location_link: Option<String>,
    #[serde(default)]
    pub datastreams: Vec<DatastreamDef>,
}

impl StationMetadata {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// True until a metadata download has populated the record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.datastreams.is_empty() && self.properties.is_empty()
    }

    #[must_use]
    pub fn datastream(&self, source_property_id: &str) -> Option<&DatastreamDef> {
        self.datastreams
            .iter()
            .find(|d| d.source_property_id == source_property_id)
    }

    /// Merge freshly parsed definitions into the cached list.
    ///
    /// Existing entries keep their remote links; unknown ids are appended in
    /// source order; entries missing from `parsed` are kept.
    pub fn merge_datastreams(&mut self, parsed: Vec<DatastreamDef>) {
        for def in parsed {
            match self
                .datastreams
                .iter_mut()
                .find(|d| d.source_property_id == def.source_property_id)
            {
                Some(existing) => existing.refresh_from(&def),
                None => self.datastreams.push(def),
            }
        }
    }

    /// Human-readable station name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
