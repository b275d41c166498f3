//! Resumable download protocol against a scripted transport.
//!
//! Run with: cargo test --test partial_download_test

mod common;

use common::{MockTransport, head_with_length, ok_body};
use transloader::entity::DownloadState;
use transloader::http::{FetchOutcome, HttpResponse, fetch};

const URL: &str = "http://logger.example.com/CBAY_MET_1HR.dat";

#[tokio::test]
async fn first_download_fetches_entire_file() {
    let mock = MockTransport::new();
    mock.on_get(URL, ok_body("0123456789"));

    let outcome = fetch(&*mock, URL, None).await.unwrap();

    assert!(outcome.is_full_file());
    assert_eq!(outcome.content_length(), Some(10));
    assert!(outcome.last_modified().is_some());
    assert_eq!(mock.methods(), vec!["GET"]);
    assert!(mock.requests()[0].headers.is_empty());
}

#[tokio::test]
async fn equal_length_issues_head_only() {
    let mock = MockTransport::new();
    mock.on_head(URL, head_with_length(10));

    let mut state = DownloadState::new(URL);
    state.content_length = Some(10);
    let before = state.clone();

    let outcome = fetch(&*mock, URL, state.offset()).await.unwrap();
    state.apply(&outcome);

    assert!(matches!(outcome, FetchOutcome::NoNewData { content_length: 10, .. }));
    assert!(outcome.body().is_none());
    assert_eq!(mock.methods(), vec!["HEAD"]);
    assert_eq!(state, before);
}

#[tokio::test]
async fn length_probe_asks_for_uncompressed_size() {
    let mock = MockTransport::new();
    mock.on_head(URL, head_with_length(10));

    fetch(&*mock, URL, Some(10)).await.unwrap();

    let probe = &mock.requests()[0];
    assert_eq!(probe.method, "HEAD");
    assert_eq!(
        probe.headers,
        vec![("Accept-Encoding".to_string(), "identity".to_string())]
    );
}

#[tokio::test]
async fn shorter_remote_file_is_refetched_in_full() {
    let mock = MockTransport::new();
    mock.on_head(URL, head_with_length(4));
    mock.on_get(URL, ok_body("abcd"));

    let outcome = fetch(&*mock, URL, Some(10)).await.unwrap();

    assert!(outcome.is_full_file());
    assert_eq!(outcome.content_length(), Some(4));
    assert_eq!(mock.methods(), vec!["HEAD", "GET"]);
    let get = &mock.requests()[1];
    assert!(!get.headers.iter().any(|(name, _)| name == "Range"));
}

#[tokio::test]
async fn longer_remote_file_is_fetched_by_range() {
    let mock = MockTransport::new();
    mock.on_head(URL, head_with_length(15));
    mock.on_get(
        URL,
        HttpResponse::new(206).with_body(b"ABCDE".to_vec()),
    );

    let mut state = DownloadState::new(URL);
    state.content_length = Some(10);
    state.full_file = true;

    let outcome = fetch(&*mock, URL, state.offset()).await.unwrap();
    state.apply(&outcome);

    assert_eq!(outcome.body(), Some(&b"ABCDE"[..]));
    assert_eq!(state.offset(), Some(15));
    assert!(!state.full_file);
    // Last-Modified falls back to the HEAD probe
    assert!(state.last_modified.is_some());

    let get = &mock.requests()[1];
    assert!(get.headers.contains(&("Range".to_string(), "bytes=10-".to_string())));
    assert!(get.headers.contains(&("Accept-Encoding".to_string(), "identity".to_string())));
}

#[tokio::test]
async fn range_not_satisfiable_means_no_new_data() {
    let mock = MockTransport::new();
    mock.on_head(URL, head_with_length(15));
    mock.on_get(URL, HttpResponse::new(416));

    let outcome = fetch(&*mock, URL, Some(10)).await.unwrap();

    assert!(matches!(outcome, FetchOutcome::NoNewData { content_length: 10, .. }));
}

#[tokio::test]
async fn ignored_range_is_a_failure_that_keeps_state() {
    let mock = MockTransport::new();
    mock.on_head(URL, head_with_length(15));
    mock.on_get(URL, ok_body("0123456789ABCDE"));

    let mut state = DownloadState::new(URL);
    state.content_length = Some(10);
    let before = state.clone();

    let outcome = fetch(&*mock, URL, state.offset()).await.unwrap();
    state.apply(&outcome);

    assert!(matches!(outcome, FetchOutcome::Failed { status: 200, .. }));
    assert_eq!(state, before);
    assert!(outcome.into_result().is_err());
}

#[tokio::test]
async fn missing_content_length_falls_back_to_full_download() {
    let mock = MockTransport::new();
    mock.on_head(URL, HttpResponse::new(200));
    mock.on_get(URL, ok_body("0123456789AB"));

    let outcome = fetch(&*mock, URL, Some(10)).await.unwrap();

    assert!(outcome.is_full_file());
    assert_eq!(outcome.content_length(), Some(12));
}
