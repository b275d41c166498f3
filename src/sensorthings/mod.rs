//! Client and payloads for the OGC SensorThings API.

pub mod client;
pub mod models;

pub use client::{SensorThingsClient, entity_id_from_link};
pub use models::{
    DatastreamPayload, EntityRef, LocationPayload, ObservationPayload, ObservedPropertyPayload,
    SensorPayload, ThingPayload,
};
