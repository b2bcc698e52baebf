//! Status, headers and body bytes for range and full retrievals.

use axum::http::{StatusCode, header};
use proptest::prelude::*;
use reel_core::storage::test_fixtures::{FixtureLibrary, patterned_bytes};
use reel_tests::{fetch, router_for};

fn library_with(id: &str, len: usize) -> (FixtureLibrary, bytes::Bytes) {
    let library = FixtureLibrary::new();
    let data = patterned_bytes(len);
    library.add(id, data.clone());
    (library, data)
}

#[tokio::test]
async fn test_middle_range_of_thousand_byte_object() {
    let (library, data) = library_with("rec", 1000);
    let router = router_for(library.locator());

    let response = fetch(&router, "/objects/rec", Some("bytes=500-599")).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.header(header::CONTENT_RANGE),
        Some("bytes 500-599/1000")
    );
    assert_eq!(response.header(header::ACCEPT_RANGES), Some("bytes"));
    assert_eq!(response.content_length(), Some(100));
    assert_eq!(response.bytes(), &data.slice(500..600));
}

#[tokio::test]
async fn test_open_ended_range_returns_suffix() {
    let (library, data) = library_with("rec", 1000);
    let router = router_for(library.locator());

    let response = fetch(&router, "/objects/rec", Some("bytes=900-")).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.header(header::CONTENT_RANGE),
        Some("bytes 900-999/1000")
    );
    assert_eq!(response.content_length(), Some(100));
    assert_eq!(response.bytes(), &data.slice(900..));
}

#[tokio::test]
async fn test_suffix_length_range() {
    let (library, data) = library_with("rec", 1000);
    let router = router_for(library.locator());

    let response = fetch(&router, "/objects/rec", Some("bytes=-250")).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.header(header::CONTENT_RANGE),
        Some("bytes 750-999/1000")
    );
    assert_eq!(response.bytes(), &data.slice(750..));
}

#[tokio::test]
async fn test_no_range_returns_whole_object() {
    let (library, data) = library_with("rec", 1000);
    let router = router_for(library.locator());

    let response = fetch(&router, "/objects/rec", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_length(), Some(1000));
    assert_eq!(response.header(header::CONTENT_TYPE), Some("video/webm"));
    assert!(response.header(header::CONTENT_RANGE).is_none());
    assert_eq!(response.bytes(), &data);
}

#[tokio::test]
async fn test_range_starting_at_length_is_unsatisfiable() {
    let (library, _) = library_with("rec", 1000);
    let router = router_for(library.locator());

    let response = fetch(&router, "/objects/rec", Some("bytes=1000-1010")).await;

    assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.header(header::CONTENT_RANGE), Some("bytes */1000"));
    assert!(response.bytes().is_empty());
}

#[tokio::test]
async fn test_empty_object_rejects_every_range() {
    let (library, _) = library_with("empty", 0);
    let router = router_for(library.locator());

    for range in ["bytes=0-", "bytes=0-0", "bytes=-1", "bytes=5-10"] {
        let response = fetch(&router, "/objects/empty", Some(range)).await;
        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE, "{range}");
        assert_eq!(response.header(header::CONTENT_RANGE), Some("bytes */0"));
        assert!(response.bytes().is_empty());
    }

    let response = fetch(&router, "/objects/empty", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_length(), Some(0));
}

#[tokio::test]
async fn test_malformed_range_falls_back_to_full_content() {
    let (library, data) = library_with("rec", 64);
    let router = router_for(library.locator());

    for range in ["items=0-5", "bytes=five-six", "bytes=0-1,4-5"] {
        let response = fetch(&router, "/objects/rec", Some(range)).await;
        assert_eq!(response.status, StatusCode::OK, "{range}");
        assert_eq!(response.bytes(), &data);
    }
}

#[tokio::test]
async fn test_repeated_range_requests_are_identical() {
    let (library, _) = library_with("rec", 5000);
    let router = router_for(library.locator());

    let first = fetch(&router, "/objects/rec", Some("bytes=1234-4321")).await;
    let second = fetch(&router, "/objects/rec", Some("bytes=1234-4321")).await;

    assert_eq!(first.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(first.bytes(), second.bytes());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_any_valid_range_serves_exact_bytes(
        len in 1usize..4096,
        a in any::<usize>(),
        b in any::<usize>()
    ) {
        let (start, end) = {
            let (x, y) = (a % len, b % len);
            (x.min(y), x.max(y))
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (library, data) = library_with("rec", len);
        let router = router_for(library.locator());

        let range = format!("bytes={start}-{end}");
        let response = runtime.block_on(fetch(&router, "/objects/rec", Some(&range)));

        prop_assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
        let expected_range = format!("bytes {start}-{end}/{len}");
        prop_assert_eq!(response.header(header::CONTENT_RANGE), Some(expected_range.as_str()));
        prop_assert_eq!(response.content_length(), Some((end - start + 1) as u64));
        prop_assert_eq!(response.bytes(), &data.slice(start..=end));
    }
}
