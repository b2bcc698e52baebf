//! Read failures after headers are committed.

use std::sync::Arc;

use axum::http::StatusCode;
use reel_core::ObjectLocator;
use reel_core::storage::InMemoryMetadataStore;
use reel_core::storage::test_fixtures::{FailingStorage, patterned_bytes, webm_metadata};
use reel_tests::{fetch, router_for};

fn failing_router(len: usize, fail_at: u64) -> axum::Router {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let recording = webm_metadata("flaky", len as u64);
    let storage = Arc::new(FailingStorage::new());
    storage.insert(recording.location.clone(), patterned_bytes(len), fail_at);
    metadata.register(recording);
    router_for(ObjectLocator::new(metadata, storage))
}

#[tokio::test]
async fn test_read_failure_keeps_status_and_truncates_body() {
    let router = failing_router(1000, 300);

    let response = fetch(&router, "/objects/flaky", None).await;

    // The status was committed before the failure surfaced.
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_length(), Some(1000));
    assert!(response.body.is_err());
}

#[tokio::test]
async fn test_read_failure_inside_partial_range() {
    let router = failing_router(1000, 550);

    let response = fetch(&router, "/objects/flaky", Some("bytes=500-599")).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.content_length(), Some(100));
    assert!(response.body.is_err());
}

#[tokio::test]
async fn test_range_before_failure_point_is_unaffected() {
    let router = failing_router(1000, 550);

    let response = fetch(&router, "/objects/flaky", Some("bytes=100-549")).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.bytes(), &patterned_bytes(1000).slice(100..550));
}
