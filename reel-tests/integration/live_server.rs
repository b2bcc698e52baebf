//! Behavior over a real socket: concurrency, truncation, client aborts.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use reel_core::ObjectLocator;
use reel_core::storage::InMemoryMetadataStore;
use reel_core::storage::test_fixtures::{
    FailingStorage, FixtureLibrary, patterned_bytes, webm_metadata,
};
use reel_tests::router_for;

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_concurrent_ranges_on_one_object() {
    let library = FixtureLibrary::new();
    let data = patterned_bytes(64 * 1024);
    library.add("shared", data.clone());
    let addr = spawn_server(router_for(library.locator())).await;
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for i in 0..16u64 {
        let client = client.clone();
        let start = i * 3000;
        let end = start + 2999 + i;
        tasks.push(tokio::spawn(async move {
            let response = client
                .get(format!("http://{addr}/objects/shared"))
                .header("Range", format!("bytes={start}-{end}"))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::PARTIAL_CONTENT);
            (start, end, response.bytes().await.unwrap())
        }));
    }

    for task in tasks {
        let (start, end, body) = task.await.unwrap();
        assert_eq!(body, data.slice(start as usize..=end as usize));
    }
}

#[tokio::test]
async fn test_client_sees_truncated_body_on_read_failure() {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let recording = webm_metadata("flaky", 10_000);
    let storage = Arc::new(FailingStorage::new());
    storage.insert(recording.location.clone(), patterned_bytes(10_000), 4_000);
    metadata.register(recording);
    let addr = spawn_server(router_for(ObjectLocator::new(metadata, storage))).await;

    let response = reqwest::get(format!("http://{addr}/objects/flaky"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.content_length(), Some(10_000));

    // The connection closes before Content-Length bytes arrive.
    assert!(response.bytes().await.is_err());
}

#[tokio::test]
async fn test_server_keeps_serving_after_client_abort() {
    let library = FixtureLibrary::new();
    let data = patterned_bytes(512 * 1024);
    library.add("long", data.clone());
    let addr = spawn_server(router_for(library.locator())).await;
    let url = format!("http://{addr}/objects/long");

    let mut aborted = reqwest::get(&url).await.unwrap();
    let first = aborted.chunk().await.unwrap().unwrap();
    assert!(!first.is_empty());
    drop(aborted);

    let response = reqwest::Client::new()
        .get(&url)
        .header("Range", "bytes=-10")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.bytes().await.unwrap(), data.slice(data.len() - 10..));
}
