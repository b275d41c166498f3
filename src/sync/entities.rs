use serde_json::Value;

use crate::cache::StationCache;
use crate::entity::StationMetadata;
use crate::error::{AppError, AppResult};
use crate::sensorthings::{
    DatastreamPayload, LocationPayload, ObservedPropertyPayload, SensorPayload,
    SensorThingsClient, ThingPayload, entity_id_from_link,
};
use crate::sync::PropertyFilter;

/// Create the Thing, Location, and per-property Sensor, ObservedProperty and
/// Datastream for a station, reusing every entity whose link is already cached.
///
/// The metadata is saved after each created entity, so a failure part-way
/// through keeps everything created so far.
///
/// # Errors
///
/// Returns `AppError::MissingCoordinates` before any request if the station
/// has no latitude/longitude, and `AppError::EntityCreation` for the first
/// rejected POST.
pub async fn synchronize(
    metadata: &mut StationMetadata,
    cache: &StationCache,
    client: &SensorThingsClient<'_>,
    filter: &PropertyFilter,
) -> AppResult<usize> {
    let (Some(latitude), Some(longitude)) = (metadata.latitude, metadata.longitude) else {
        return Err(AppError::MissingCoordinates(metadata.id.clone()));
    };

    let mut created = 0;

    let thing_link = match metadata.remote_thing_link.clone() {
        Some(link) => {
            tracing::debug!(station = %metadata.id, link = %link, "Reusing Thing");
            link
        }
        None => {
            let link = client
                .create_thing(&ThingPayload::for_station(metadata))
                .await?;
            tracing::info!(station = %metadata.id, link = %link, "Created Thing");
            metadata.remote_thing_link = Some(link.clone());
            cache.save_metadata(metadata)?;
            created += 1;
            link
        }
    };

    if metadata.remote_location_link.is_none() {
        let payload = LocationPayload::new(metadata, latitude, longitude);
        let link = client.create_location(&thing_link, &payload).await?;
        tracing::info!(station = %metadata.id, link = %link, "Created Location");
        metadata.remote_location_link = Some(link);
        cache.save_metadata(metadata)?;
        created += 1;
    }

    for index in 0..metadata.datastreams.len() {
        let id = metadata.datastreams[index].source_property_id.clone();
        if !filter.allows(&id) {
            tracing::debug!(station = %metadata.id, datastream = %id, "Skipping filtered datastream");
            continue;
        }

        let sensor_link = match metadata.datastreams[index].remote_sensor_link.clone() {
            Some(link) => link,
            None => {
                let payload = SensorPayload::new(metadata, &metadata.datastreams[index]);
                let link = client.create_sensor(&payload).await?;
                tracing::debug!(datastream = %id, link = %link, "Created Sensor");
                metadata.datastreams[index].remote_sensor_link = Some(link.clone());
                cache.save_metadata(metadata)?;
                created += 1;
                link
            }
        };

        let observed_property_link =
            match metadata.datastreams[index].remote_observed_property_link.clone() {
                Some(link) => link,
                None => {
                    let payload = ObservedPropertyPayload::new(&metadata.datastreams[index]);
                    let link = client.create_observed_property(&payload).await?;
                    tracing::debug!(datastream = %id, link = %link, "Created ObservedProperty");
                    metadata.datastreams[index].remote_observed_property_link = Some(link.clone());
                    cache.save_metadata(metadata)?;
                    created += 1;
                    link
                }
            };

        if metadata.datastreams[index].remote_datastream_link.is_none() {
            let payload = DatastreamPayload::new(
                metadata,
                &metadata.datastreams[index],
                link_id(&sensor_link),
                link_id(&observed_property_link),
            );
            let link = client.create_datastream(&thing_link, &payload).await?;
            tracing::debug!(datastream = %id, link = %link, "Created Datastream");
            metadata.datastreams[index].remote_datastream_link = Some(link);
            cache.save_metadata(metadata)?;
            created += 1;
        }
    }

    tracing::info!(station = %metadata.id, created, "Metadata synchronized");
    Ok(created)
}

/// `@iot.id` of a linked entity; an unparseable link is passed through as-is.
fn link_id(link: &str) -> Value {
    entity_id_from_link(link).unwrap_or_else(|| Value::String(link.to_string()))
}
