//! Shared helpers for Reel integration tests.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use bytes::Bytes;
use reel_core::ObjectLocator;
use reel_core::config::ReelConfig;
use reel_web::{AppState, build_router};
use tower::ServiceExt;

/// A response with its body fully drained.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Err` when the body stream failed before completion
    pub body: Result<Bytes, axum::Error>,
}

impl Fetched {
    /// Header value as a string, if present.
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Advertised `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.header(header::CONTENT_LENGTH)?.parse().ok()
    }

    /// Body bytes, panicking if the body failed.
    ///
    /// # Panics
    ///
    /// Panics if the body stream ended with an error.
    pub fn bytes(&self) -> &Bytes {
        self.body.as_ref().expect("body stream failed")
    }
}

/// Router over `locator` using the testing configuration.
pub fn router_for(locator: ObjectLocator) -> Router {
    router_with_config(locator, &ReelConfig::for_testing())
}

/// Router over `locator` using `config`.
pub fn router_with_config(locator: ObjectLocator, config: &ReelConfig) -> Router {
    build_router(AppState::new(locator, &config.streaming))
}

/// Sends `GET uri` with an optional `Range` header through `router`.
///
/// # Panics
///
/// Panics if the request cannot be built or the router fails to respond.
pub async fn fetch(router: &Router, uri: &str, range: Option<&str>) -> Fetched {
    let mut request = Request::builder().uri(uri);
    if let Some(range) = range {
        request = request.header(header::RANGE, range);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await;
    Fetched {
        status,
        headers,
        body,
    }
}
