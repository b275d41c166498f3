//! Entity synchronization: creation order, reuse of cached links, filters.
//!
//! Run with: cargo test --test synchronizer_test

mod common;

use common::{DESTINATION, MockTransport};
use tempfile::TempDir;
use transloader::cache::{CacheLayout, StationCache};
use transloader::entity::{DatastreamDef, StationMetadata};
use transloader::error::AppError;
use transloader::ontology::Ontology;
use transloader::sensorthings::SensorThingsClient;
use transloader::sources::Source;
use transloader::sync::{PropertyFilter, synchronize};

fn station(ids: &[&str]) -> StationMetadata {
    let ontology = Ontology::for_source(Source::CampbellScientific).unwrap();
    let mut metadata = StationMetadata::new("CBAY");
    metadata.name = Some("Cambridge Bay".to_string());
    metadata.latitude = Some(69.1);
    metadata.longitude = Some(-105.1);
    metadata.datastreams = ids
        .iter()
        .map(|id| DatastreamDef::new(id, None, ontology.resolve(id)))
        .collect();
    metadata
}

fn cache(dir: &TempDir) -> StationCache {
    let layout = CacheLayout::new(dir.path(), Source::CampbellScientific);
    layout.create().unwrap();
    StationCache::new(layout, "CBAY")
}

#[tokio::test]
async fn creates_all_entities_then_reuses_them() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let mock = MockTransport::new();
    let client = SensorThingsClient::new(&*mock, DESTINATION);
    let mut metadata = station(&["BP_Avg", "AirTC_Avg"]);

    let created = synchronize(&mut metadata, &cache, &client, &PropertyFilter::All)
        .await
        .unwrap();

    // Thing + Location + 2 x (Sensor, ObservedProperty, Datastream)
    assert_eq!(created, 8);
    assert_eq!(mock.posts_to("/Things").len(), 1);
    assert_eq!(mock.posts_to("/Locations").len(), 1);
    assert_eq!(mock.posts_to("/Sensors").len(), 2);
    assert_eq!(mock.posts_to("/ObservedProperties").len(), 2);
    assert_eq!(mock.posts_to("/Datastreams").len(), 2);

    let thing_link = metadata.remote_thing_link.clone().unwrap();
    assert_eq!(thing_link, format!("{DESTINATION}/Things(1)"));
    assert_eq!(
        mock.posts_to("/Locations")[0].url,
        format!("{thing_link}/Locations")
    );

    // Every link was written back to the cache file
    let cached = cache.load_metadata().unwrap().unwrap();
    assert_eq!(cached, metadata);
    assert!(cached.datastreams.iter().all(|d| d.remote_datastream_link.is_some()));

    mock.clear();
    let created = synchronize(&mut metadata, &cache, &client, &PropertyFilter::All)
        .await
        .unwrap();
    assert_eq!(created, 0);
    assert!(mock.posts().is_empty());
}

#[tokio::test]
async fn datastream_references_sensor_and_property_by_id() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let mock = MockTransport::new();
    let client = SensorThingsClient::new(&*mock, DESTINATION);
    let mut metadata = station(&["BP_Avg"]);

    synchronize(&mut metadata, &cache, &client, &PropertyFilter::All)
        .await
        .unwrap();

    let location = mock.posts_to("/Locations")[0].body.clone().unwrap();
    assert_eq!(location["location"]["type"], "Point");
    assert_eq!(location["location"]["coordinates"][0], -105.1);
    assert_eq!(location["location"]["coordinates"][1], 69.1);

    let sensor = mock.posts_to("/Sensors")[0].body.clone().unwrap();
    assert_eq!(sensor["encodingType"], "application/pdf");

    // Thing(1), Location(2), Sensor(3), ObservedProperty(4)
    let datastream = mock.posts_to("/Datastreams")[0].body.clone().unwrap();
    assert_eq!(datastream["Sensor"]["@iot.id"], 3);
    assert_eq!(datastream["ObservedProperty"]["@iot.id"], 4);
    assert_eq!(
        datastream["observationType"],
        "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement"
    );
    assert!(datastream["unitOfMeasurement"]["definition"].is_string());
}

#[tokio::test]
async fn allow_list_limits_created_datastreams() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let mock = MockTransport::new();
    let client = SensorThingsClient::new(&*mock, DESTINATION);
    let mut metadata = station(&["A", "B", "C"]);

    let filter = PropertyFilter::new(Some(vec!["A".to_string()]), None).unwrap();
    synchronize(&mut metadata, &cache, &client, &filter)
        .await
        .unwrap();

    assert_eq!(mock.posts_to("/Datastreams").len(), 1);
    assert!(metadata.datastream("A").unwrap().remote_datastream_link.is_some());
    assert!(metadata.datastream("B").unwrap().remote_datastream_link.is_none());
}

#[tokio::test]
async fn block_list_skips_datastreams() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let mock = MockTransport::new();
    let client = SensorThingsClient::new(&*mock, DESTINATION);
    let mut metadata = station(&["A", "B", "C"]);

    let filter = PropertyFilter::new(None, Some(vec!["A".to_string()])).unwrap();
    synchronize(&mut metadata, &cache, &client, &filter)
        .await
        .unwrap();

    assert_eq!(mock.posts_to("/Datastreams").len(), 2);
    assert!(metadata.datastream("A").unwrap().remote_sensor_link.is_none());
}

#[tokio::test]
async fn missing_coordinates_fail_before_any_request() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let mock = MockTransport::new();
    let client = SensorThingsClient::new(&*mock, DESTINATION);
    let mut metadata = station(&["A"]);
    metadata.latitude = None;

    let result = synchronize(&mut metadata, &cache, &client, &PropertyFilter::All).await;

    assert!(matches!(result, Err(AppError::MissingCoordinates(_))));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn failed_post_keeps_entities_created_so_far() {
    let dir = TempDir::new().unwrap();
    let cache = cache(&dir);
    let mock = MockTransport::new();
    mock.fail_posts_to(&format!("{DESTINATION}/ObservedProperties"), 400);
    let client = SensorThingsClient::new(&*mock, DESTINATION);
    let mut metadata = station(&["A"]);

    let result = synchronize(&mut metadata, &cache, &client, &PropertyFilter::All).await;

    assert!(matches!(
        result,
        Err(AppError::EntityCreation {
            entity: "ObservedProperty",
            status: 400,
            ..
        })
    ));

    let cached = cache.load_metadata().unwrap().unwrap();
    assert!(cached.remote_thing_link.is_some());
    assert!(cached.remote_location_link.is_some());
    assert!(cached.datastreams[0].remote_sensor_link.is_some());
    assert!(cached.datastreams[0].remote_observed_property_link.is_none());
}
