//! Mapping of retrieval failures onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reel_core::streaming::RangeRejected;
use reel_core::{LocateError, StorageError};
use serde_json::json;
use tracing::error;

/// Errors a handler answers before any body byte is sent.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unknown id, or an id that cannot name a recording
    #[error("Recording not found")]
    RecordingNotFound,

    /// Metadata exists but the file is gone
    #[error("Recording file not found")]
    FileNotFound,

    /// `Range` header refused under the strict policy
    #[error("Malformed Range header")]
    MalformedRange,

    /// Integrity or collaborator failure
    #[error("Failed to fetch recording")]
    Internal,
}

impl ApiError {
    /// Status code sent for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RecordingNotFound | ApiError::FileNotFound => StatusCode::NOT_FOUND,
            ApiError::MalformedRange => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LocateError> for ApiError {
    fn from(e: LocateError) -> Self {
        match e {
            LocateError::NotFound { .. } => ApiError::RecordingNotFound,
            LocateError::ContentMissing { .. } => ApiError::FileNotFound,
            // Already logged by the locator.
            LocateError::LengthMismatch { .. } => ApiError::Internal,
            LocateError::Storage(e) => {
                error!("Storage failure while locating recording: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidRecordingId { .. } => ApiError::RecordingNotFound,
            other => ApiError::from(LocateError::Storage(other)),
        }
    }
}

impl From<RangeRejected> for ApiError {
    fn from(_: RangeRejected) -> Self {
        ApiError::MalformedRange
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use reel_core::RecordingId;

    use super::*;

    #[test]
    fn test_locate_errors_map_to_status() {
        let id = RecordingId::new("1").unwrap();
        let not_found = ApiError::from(LocateError::NotFound { id: id.clone() });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let missing = ApiError::from(LocateError::ContentMissing {
            id: id.clone(),
            location: "1.webm".into(),
        });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let mismatch = ApiError::from(LocateError::LengthMismatch {
            id,
            expected: 2,
            actual: 1,
        });
        assert_eq!(mismatch.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_id_is_not_found() {
        let err = ApiError::from(RecordingId::new("").unwrap_err());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
