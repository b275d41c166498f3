use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::entity::{DatastreamDef, StationMetadata, UnitOfMeasurement};

/// OGC "unknown" definition, used for observed properties the ontology has no URI for.
pub const UNKNOWN_DEFINITION: &str = "http://www.opengis.net/def/nil/OGC/0/unknown";

const GEOJSON_ENCODING: &str = "application/vnd.geo+json";
const SENSOR_ENCODING: &str = "application/pdf";
const SENSOR_METADATA: &str = "http://example.org/unknown";

/// Reference to an existing entity by `@iot.id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRef {
    #[serde(rename = "@iot.id")]
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThingPayload {
    pub name: String,
    pub description: String,
    pub properties: BTreeMap<String, String>,
}

impl ThingPayload {
    #[must_use]
    pub fn for_station(metadata: &StationMetadata) -> Self {
        let name = metadata.display_name().to_string();
        Self {
            description: format!("{name} weather station"),
            name,
            properties: metadata.properties.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoJsonPoint {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[longitude, latitude]` or `[longitude, latitude, elevation]`.
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub name: String,
    pub description: String,
    pub encoding_type: &'static str,
    pub location: GeoJsonPoint,
}

impl LocationPayload {
    #[must_use]
    pub fn new(metadata: &StationMetadata, latitude: f64, longitude: f64) -> Self {
        let mut coordinates = vec![longitude, latitude];
        if let Some(elevation) = metadata.elevation {
            coordinates.push(elevation);
        }

        let name = metadata.display_name().to_string();
        Self {
            description: format!("{name} station location"),
            name,
            encoding_type: GEOJSON_ENCODING,
            location: GeoJsonPoint {
                kind: "Point",
                coordinates,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorPayload {
    pub name: String,
    pub description: String,
    pub encoding_type: &'static str,
    pub metadata: &'static str,
}

impl SensorPayload {
    #[must_use]
    pub fn new(station: &StationMetadata, def: &DatastreamDef) -> Self {
        Self {
            name: format!("Station {} {} Sensor", station.id, def.canonical_label),
            description: "Unknown".to_string(),
            encoding_type: SENSOR_ENCODING,
            metadata: SENSOR_METADATA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedPropertyPayload {
    pub name: String,
    pub definition: String,
    pub description: String,
}

impl ObservedPropertyPayload {
    #[must_use]
    pub fn new(def: &DatastreamDef) -> Self {
        Self {
            name: def.canonical_label.clone(),
            definition: def
                .definition
                .clone()
                .unwrap_or_else(|| UNKNOWN_DEFINITION.to_string()),
            description: def.canonical_label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatastreamPayload {
    pub name: String,
    pub description: String,
    pub unit_of_measurement: UnitOfMeasurement,
    pub observation_type: String,
    #[serde(rename = "Sensor")]
    pub sensor: EntityRef,
    #[serde(rename = "ObservedProperty")]
    pub observed_property: EntityRef,
}

impl DatastreamPayload {
    #[must_use]
    pub fn new(
        station: &StationMetadata,
        def: &DatastreamDef,
        sensor_id: Value,
        observed_property_id: Value,
    ) -> Self {
        // Without an ontology unit, describe the raw source unit as best we can.
        let unit_of_measurement = def.unit_of_measure.clone().unwrap_or_else(|| {
            let units = def.source_units.clone().unwrap_or_default();
            UnitOfMeasurement {
                name: units.clone(),
                symbol: units,
                definition: String::new(),
            }
        });

        Self {
            name: format!("Station {} {}", station.id, def.canonical_label),
            description: format!(
                "{} {} from {}",
                def.canonical_label,
                def.source_property_id,
                station.display_name()
            ),
            unit_of_measurement,
            observation_type: def.observation_type_uri.clone(),
            sensor: EntityRef { id: sensor_id },
            observed_property: EntityRef {
                id: observed_property_id,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationPayload {
    pub phenomenon_time: String,
    pub result_time: String,
    pub result: Value,
}
