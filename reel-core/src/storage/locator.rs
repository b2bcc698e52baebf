//! Resolves a recording id to its length and a request-scoped handle.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{
    MetadataStore, ObjectHandle, ObjectStorage, RecordingId, RecordingMetadata, StorageError,
};

/// A recording resolved for one retrieval request.
///
/// Owns the only handle to the bytes; dropping the object releases it.
pub struct StoredObject {
    /// Metadata the recording was registered with
    pub metadata: RecordingMetadata,
    /// Total byte length, agreed on by metadata and storage
    pub length: u64,
    /// Seekable handle positioned at offset zero
    pub handle: Box<dyn ObjectHandle>,
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("metadata", &self.metadata)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// Reasons a recording cannot be served.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// No recording is registered under the id
    #[error("Recording {id} not found")]
    NotFound {
        /// Requested id
        id: RecordingId,
    },

    /// Metadata exists but the bytes are gone from storage
    #[error("Recording {id} has no content at {}", .location.display())]
    ContentMissing {
        /// Requested id
        id: RecordingId,
        /// Location the metadata points at
        location: PathBuf,
    },

    /// Metadata and storage disagree about the object's length
    #[error("Recording {id} length mismatch: metadata says {expected} bytes, storage has {actual}")]
    LengthMismatch {
        /// Requested id
        id: RecordingId,
        /// Length recorded in metadata
        expected: u64,
        /// Length readable from storage
        actual: u64,
    },

    /// A collaborator failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LocateError {
    /// Whether the caller should see this as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LocateError::NotFound { .. } | LocateError::ContentMissing { .. }
        )
    }
}

/// Joins the metadata store and object storage for retrieval.
///
/// Nothing is cached: every call re-reads metadata and opens a new handle.
#[derive(Clone)]
pub struct ObjectLocator {
    metadata: Arc<dyn MetadataStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl ObjectLocator {
    /// Creates a locator over the given collaborators.
    pub fn new(metadata: Arc<dyn MetadataStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { metadata, storage }
    }

    /// Resolves `id` to a stored object with a freshly opened handle.
    ///
    /// # Errors
    ///
    /// - `LocateError::NotFound` - No metadata for `id`
    /// - `LocateError::ContentMissing` - Metadata exists but storage has no bytes
    /// - `LocateError::LengthMismatch` - Metadata size differs from the readable length
    /// - `LocateError::Storage` - A collaborator failed
    pub async fn locate(&self, id: &RecordingId) -> Result<StoredObject, LocateError> {
        let Some(metadata) = self.metadata.lookup(id).await? else {
            debug!("No metadata for recording {}", id);
            return Err(LocateError::NotFound { id: id.clone() });
        };

        let Some(opened) = self.storage.open(&metadata.location).await? else {
            warn!(
                "Metadata/storage drift: recording {} points at missing content {}",
                id,
                metadata.location.display()
            );
            return Err(LocateError::ContentMissing {
                id: id.clone(),
                location: metadata.location,
            });
        };

        if opened.length != metadata.size {
            error!(
                "Integrity error for recording {}: metadata size {} != stored length {}",
                id, metadata.size, opened.length
            );
            return Err(LocateError::LengthMismatch {
                id: id.clone(),
                expected: metadata.size,
                actual: opened.length,
            });
        }

        Ok(StoredObject {
            length: opened.length,
            handle: opened.handle,
            metadata,
        })
    }
}
