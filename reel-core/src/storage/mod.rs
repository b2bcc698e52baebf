//! Storage layer for recordings.
//!
//! Two collaborators sit behind traits: a [`MetadataStore`] that knows which
//! recordings exist and where their bytes live, and an [`ObjectStorage`] that
//! opens a fresh seekable handle to those bytes. The [`ObjectLocator`] joins
//! the two for a single retrieval request.

pub mod file_storage;
pub mod locator;
pub mod memory_storage;
pub mod metadata;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use file_storage::FileSystemStorage;
pub use locator::{LocateError, ObjectLocator, StoredObject};
pub use memory_storage::InMemoryStorage;
pub use metadata::InMemoryMetadataStore;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncSeek};

/// Media type served when neither the metadata nor the file extension names one.
pub const DEFAULT_CONTENT_TYPE: &str = "video/webm";

/// Opaque, externally assigned identifier of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordingId(String);

impl RecordingId {
    /// Creates a recording identifier.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidRecordingId` - If the identifier is empty or
    ///   contains a path separator or control character
    pub fn new(id: impl Into<String>) -> Result<Self, StorageError> {
        let id = id.into();
        if id.is_empty() || id.contains(['/', '\\']) || id.chars().any(char::is_control) {
            return Err(StorageError::InvalidRecordingId { id });
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl TryFrom<String> for RecordingId {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordingId> for String {
    fn from(id: RecordingId) -> Self {
        id.0
    }
}

/// Metadata recorded for a stored recording when it was ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Stable identifier used in retrieval URLs
    pub id: RecordingId,
    /// Original file name
    pub name: String,
    /// Byte length recorded at ingest time
    pub size: u64,
    /// Where the bytes live, as understood by the [`ObjectStorage`]
    pub location: PathBuf,
    /// Explicit media type; guessed from `location` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Ingest timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl RecordingMetadata {
    /// Media type to advertise in `Content-Type`.
    ///
    /// Prefers the stored value, then a guess from the file extension,
    /// then [`DEFAULT_CONTENT_TYPE`].
    pub fn content_type(&self) -> String {
        if let Some(content_type) = &self.content_type {
            return content_type.clone();
        }
        mime_guess::from_path(&self.location)
            .first_raw()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }
}

/// Seekable, readable access to the bytes of one stored object.
pub trait ObjectHandle: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> ObjectHandle for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

/// A freshly opened handle plus the length readable through it.
pub struct OpenedObject {
    /// Handle owned by exactly one retrieval request
    pub handle: Box<dyn ObjectHandle>,
    /// Number of bytes readable from offset zero, observed at open time
    pub length: u64,
}

impl fmt::Debug for OpenedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedObject")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Registry of recordings and their storage locations.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Looks up metadata for a recording.
    ///
    /// Returns `Ok(None)` if no recording is registered under `id`.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the backing registry cannot be read
    async fn lookup(&self, id: &RecordingId) -> Result<Option<RecordingMetadata>, StorageError>;

    /// Lists all registered recordings, newest first.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the backing registry cannot be read
    async fn list(&self) -> Result<Vec<RecordingMetadata>, StorageError>;
}

/// Opens independent handles to stored bytes.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Opens a new handle positioned at offset zero.
    ///
    /// Returns `Ok(None)` if nothing is stored at `location`.
    ///
    /// # Errors
    ///
    /// - `StorageError::Io` - If the content exists but cannot be opened
    async fn open(&self, location: &Path) -> Result<Option<OpenedObject>, StorageError>;
}

/// Errors that occur while talking to the storage collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Identifier cannot name a recording
    #[error("Invalid recording id: {id:?}")]
    InvalidRecordingId {
        /// The rejected identifier
        id: String,
    },

    /// Manifest file could not be decoded
    #[error("Invalid manifest {}: {reason}", .path.display())]
    Manifest {
        /// Path of the manifest
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Standard I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(location: &str, content_type: Option<&str>) -> RecordingMetadata {
        RecordingMetadata {
            id: RecordingId::new("1").unwrap(),
            name: "recording".to_string(),
            size: 10,
            location: PathBuf::from(location),
            content_type: content_type.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_recording_id_validation() {
        assert!(RecordingId::new("recording-1700000000-42").is_ok());
        assert!(RecordingId::new("").is_err());
        assert!(RecordingId::new("../etc/passwd").is_err());
        assert!(RecordingId::new("a\nb").is_err());
    }

    #[test]
    fn test_content_type_resolution() {
        assert_eq!(metadata("a.mp4", None).content_type(), "video/mp4");
        assert_eq!(metadata("a.webm", None).content_type(), "video/webm");
        assert_eq!(metadata("a", None).content_type(), DEFAULT_CONTENT_TYPE);
        assert_eq!(
            metadata("a.webm", Some("audio/webm")).content_type(),
            "audio/webm"
        );
    }

    #[test]
    fn test_metadata_manifest_shape() {
        let json = r#"{"id":"7","name":"demo.webm","size":3,"location":"demo.webm"}"#;
        let parsed: RecordingMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id.as_str(), "7");
        assert!(parsed.content_type.is_none());

        let invalid = r#"{"id":"","name":"x","size":0,"location":"x"}"#;
        assert!(serde_json::from_str::<RecordingMetadata>(invalid).is_err());
    }
}
