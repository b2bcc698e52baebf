//! Resolution failures and file-system backed retrieval.

use std::sync::Arc;

use axum::http::{StatusCode, header};
use reel_core::ObjectLocator;
use reel_core::storage::test_fixtures::{FixtureLibrary, patterned_bytes};
use reel_core::storage::{FileSystemStorage, InMemoryMetadataStore};
use reel_tests::{fetch, router_for};

#[tokio::test]
async fn test_unknown_id_is_not_found_with_or_without_range() {
    let library = FixtureLibrary::new();
    library.add("known", patterned_bytes(10));
    let router = router_for(library.locator());

    for range in [None, Some("bytes=0-4"), Some("bytes=100-200"), Some("junk")] {
        let response = fetch(&router, "/objects/unknown", range).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{range:?}");
        let error: serde_json::Value = serde_json::from_slice(response.bytes()).unwrap();
        assert_eq!(error["error"], "Recording not found");
    }
}

#[tokio::test]
async fn test_metadata_without_content_is_not_found() {
    let library = FixtureLibrary::new();
    library.add_metadata_only("orphan", 500);
    let router = router_for(library.locator());

    let response = fetch(&router, "/objects/orphan", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let error: serde_json::Value = serde_json::from_slice(response.bytes()).unwrap();
    assert_eq!(error["error"], "Recording file not found");
}

#[tokio::test]
async fn test_size_disagreement_is_server_error() {
    let library = FixtureLibrary::new();
    let id = library.add("drifted", patterned_bytes(100));
    let mut metadata = library.metadata.unregister(&id).unwrap();
    metadata.size = 120;
    library.metadata.register(metadata);
    let router = router_for(library.locator());

    let response = fetch(&router, "/objects/drifted", Some("bytes=0-9")).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_scanned_directory_is_served_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let data = patterned_bytes(2048);
    std::fs::write(dir.path().join("recording-1700000000-1.webm"), &data).unwrap();
    std::fs::write(dir.path().join("clip.mp4"), &data[..16]).unwrap();

    let metadata = Arc::new(InMemoryMetadataStore::new());
    assert_eq!(metadata.scan_directory(dir.path()).await.unwrap(), 2);
    let storage = Arc::new(FileSystemStorage::with_root(dir.path()));
    let router = router_for(ObjectLocator::new(metadata, storage));

    let response = fetch(
        &router,
        "/api/recordings/recording-1700000000-1",
        Some("bytes=1024-"),
    )
    .await;
    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.header(header::CONTENT_RANGE),
        Some("bytes 1024-2047/2048")
    );
    assert_eq!(response.bytes(), &data.slice(1024..));

    let response = fetch(&router, "/objects/clip", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(header::CONTENT_TYPE), Some("video/mp4"));
    assert_eq!(response.bytes().len(), 16);
}

#[tokio::test]
async fn test_file_deleted_after_scan_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.webm");
    std::fs::write(&path, b"soon deleted").unwrap();

    let metadata = Arc::new(InMemoryMetadataStore::new());
    metadata.scan_directory(dir.path()).await.unwrap();
    std::fs::remove_file(&path).unwrap();

    let storage = Arc::new(FileSystemStorage::with_root(dir.path()));
    let router = router_for(ObjectLocator::new(metadata, storage));

    let response = fetch(&router, "/objects/gone", Some("bytes=0-3")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
