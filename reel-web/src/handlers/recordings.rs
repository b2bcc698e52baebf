//! Recording retrieval with byte-range support.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use reel_core::RecordingId;
use reel_core::streaming::{parse_range_from_headers, plan_transfer};
use tracing::debug;

use crate::error::ApiError;
use crate::server::AppState;

/// Serves a recording, honoring a single-range `Range` header.
///
/// Responds 200 with the whole object, 206 with the requested range, 416
/// when the range lies outside the object, and 404 when the recording or
/// its file is missing.
///
/// # Errors
///
/// Returns `ApiError` for failures detected before the response is committed.
pub async fn stream_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = RecordingId::new(id)?;
    let object = state.locator.locate(&id).await?;

    let parse = parse_range_from_headers(&headers, object.length);
    let plan = plan_transfer(parse, object.length, state.malformed_range_policy)?;
    debug!(
        "Recording {}: range={:?} -> {} ({} of {} bytes)",
        id,
        headers.get(axum::http::header::RANGE),
        plan.status(),
        plan.content_length(),
        object.length
    );

    let response_headers = plan.response_headers(&object.metadata.content_type());
    let body = match plan.byte_range() {
        Some(_) => state.engine.body(object.handle, plan, format!("recording {id}")),
        None => Body::empty(),
    };

    let mut response = Response::new(body);
    *response.status_mut() = plan.status();
    *response.headers_mut() = response_headers;
    Ok(response)
}
