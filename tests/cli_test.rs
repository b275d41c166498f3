//! Argument validation and verb dispatch.
//!
//! Run with: cargo test --test cli_test

mod common;

use clap::Parser;
use clap::error::ErrorKind;
use common::{DESTINATION, MockTransport, TOA5_FILE, ok_body, state};
use tempfile::TempDir;
use transloader::cli::{self, Args, Object, Verb};
use transloader::config::Config;
use transloader::error::AppError;
use transloader::sources::Source;
use transloader::sync::{ObservationWindow, PropertyFilter};

const TOA5_URL: &str = "http://logger.example.com/CBAY_MET_1HR.dat";

fn parse(dir: &TempDir, extra: &[&str]) -> Args {
    let cache = dir.path().to_string_lossy().into_owned();
    let mut argv = vec!["transloader"];
    argv.extend_from_slice(extra);
    argv.extend_from_slice(&["--cache", cache.as_str()]);
    Args::try_parse_from(argv).unwrap()
}

fn invalid(result: Result<cli::Invocation, AppError>) -> bool {
    matches!(result, Err(AppError::InvalidArgument(_)))
}

#[test]
fn help_is_not_an_error() {
    let err = Args::try_parse_from(["transloader", "--help"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    assert!(cli::usage().contains("transloader"));
}

#[test]
fn unknown_source_is_rejected_by_the_parser() {
    let result = Args::try_parse_from([
        "transloader", "get", "metadata", "--source", "noaa", "--station", "X",
    ]);
    assert!(result.is_err());
}

#[test]
fn parses_repeatable_options() {
    let dir = TempDir::new().unwrap();
    let args = parse(
        &dir,
        &[
            "get", "observations", "--source", "campbell_scientific", "--station", "CBAY",
            "--dataurl", "http://a/1.dat", "--dataurl", "http://a/2.dat", "--block", "RH",
        ],
    );

    let invocation = args.validate(&Config::default()).unwrap();
    assert_eq!(invocation.verb, Verb::Get);
    assert_eq!(invocation.object, Object::Observations);
    assert_eq!(invocation.source, Source::CampbellScientific);
    assert_eq!(invocation.params.data_urls.len(), 2);
    assert!(!invocation.filter.allows("RH"));
}

#[test]
fn validation_rules() {
    let dir = TempDir::new().unwrap();
    let config = Config::default();

    // put needs a destination
    let args = parse(&dir, &["put", "metadata", "--source", "environment_canada", "--station", "CXCM"]);
    assert!(invalid(args.validate(&config)));

    // put observations needs a date
    let args = parse(
        &dir,
        &["put", "observations", "--source", "environment_canada", "--station", "CXCM",
          "--destination", DESTINATION],
    );
    assert!(invalid(args.validate(&config)));

    // the date must parse
    let args = parse(
        &dir,
        &["put", "observations", "--source", "environment_canada", "--station", "CXCM",
          "--destination", DESTINATION, "--date", "yesterday"],
    );
    assert!(matches!(args.validate(&config), Err(AppError::Timestamp(_))));

    // data_garrison needs a user
    let args = parse(&dir, &["get", "metadata", "--source", "data_garrison", "--station", "300234"]);
    assert!(invalid(args.validate(&config)));

    // uncached campbell_scientific needs a data URL
    let args = parse(&dir, &["get", "metadata", "--source", "campbell_scientific", "--station", "CBAY"]);
    assert!(invalid(args.validate(&config)));

    // allow and block are exclusive
    let args = parse(
        &dir,
        &["get", "metadata", "--source", "environment_canada", "--station", "CXCM",
          "--allow", "air_temp", "--block", "rel_hum"],
    );
    assert!(invalid(args.validate(&config)));
}

#[test]
fn cache_directory_must_exist() {
    let args = Args::try_parse_from([
        "transloader", "get", "metadata", "--source", "environment_canada", "--station", "CXCM",
        "--cache", "/nonexistent/transloader-cache",
    ])
    .unwrap();
    assert!(invalid(args.validate(&Config::default())));
}

#[test]
fn destination_and_cache_fall_back_to_config() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        cache_dir: Some(dir.path().to_path_buf()),
        destination: Some(DESTINATION.to_string()),
        ..Config::default()
    };
    let args = Args::try_parse_from([
        "transloader", "put", "observations", "--source", "environment_canada", "--station",
        "CXCM", "--date", "latest",
    ])
    .unwrap();

    let invocation = args.validate(&config).unwrap();
    assert_eq!(invocation.destination.as_deref(), Some(DESTINATION));
    assert_eq!(invocation.window, Some(ObservationWindow::Latest));
    assert_eq!(invocation.filter, PropertyFilter::All);
}

#[tokio::test]
async fn campbell_round_trip_through_every_verb() {
    let dir = TempDir::new().unwrap();
    let mock = MockTransport::new();
    mock.on_get(TOA5_URL, ok_body(TOA5_FILE));
    let config = Config::default();

    let get_metadata = parse(
        &dir,
        &["get", "metadata", "--source", "campbell_scientific", "--station", "CBAY",
          "--dataurl", TOA5_URL],
    )
    .validate(&config)
    .unwrap();
    cli::run(&get_metadata, state(mock.clone())).await.unwrap();

    // Coordinates and zone are filled in by hand for loggers.
    let path = dir.path().join("v2/campbell_scientific/metadata/CBAY.json");
    let mut metadata: transloader::entity::StationMetadata =
        transloader::cache::read_json(&path).unwrap().unwrap();
    metadata.latitude = Some(69.1);
    metadata.longitude = Some(-105.1);
    metadata.timezone_offset = Some("-06:00".to_string());
    transloader::cache::write_json_atomic(&path, &metadata).unwrap();

    let get_observations = parse(
        &dir,
        &["get", "observations", "--source", "campbell_scientific", "--station", "CBAY"],
    )
    .validate(&config)
    .unwrap();
    cli::run(&get_observations, state(mock.clone())).await.unwrap();

    let put_metadata = parse(
        &dir,
        &["put", "metadata", "--source", "campbell_scientific", "--station", "CBAY",
          "--destination", DESTINATION],
    )
    .validate(&config)
    .unwrap();
    cli::run(&put_metadata, state(mock.clone())).await.unwrap();
    assert_eq!(mock.posts_to("/Datastreams").len(), 2);

    let put_observations = parse(
        &dir,
        &["put", "observations", "--source", "campbell_scientific", "--station", "CBAY",
          "--destination", DESTINATION, "--date", "2019-07-03T20:00:00Z/2019-07-03T21:00:00Z"],
    )
    .validate(&config)
    .unwrap();
    cli::run(&put_observations, state(mock.clone())).await.unwrap();

    // one row (two properties) falls inside the hour
    assert_eq!(mock.posts_to("/Observations").len(), 2);
}
