//! In-memory object storage for tests and embedding.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use super::{ObjectStorage, OpenedObject, StorageError};

/// Object storage that keeps every blob in memory.
///
/// Each `open` hands out its own cursor over a cheap clone of the blob, so
/// concurrent readers never share a position.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<PathBuf, Bytes>>,
}

impl InMemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` at `location`, replacing any previous blob.
    pub fn insert(&self, location: impl Into<PathBuf>, data: impl Into<Bytes>) {
        self.objects.write().insert(location.into(), data.into());
    }

    /// Removes the blob at `location`, returning it if present.
    pub fn remove(&self, location: &Path) -> Option<Bytes> {
        self.objects.write().remove(location)
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn open(&self, location: &Path) -> Result<Option<OpenedObject>, StorageError> {
        let Some(data) = self.objects.read().get(location).cloned() else {
            return Ok(None);
        };
        let length = data.len() as u64;
        Ok(Some(OpenedObject {
            handle: Box::new(Cursor::new(data)),
            length,
        }))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};

    use super::*;

    #[tokio::test]
    async fn test_handles_have_independent_cursors() {
        let storage = InMemoryStorage::new();
        storage.insert("a", Bytes::from_static(b"abcdef"));

        let mut first = storage.open(Path::new("a")).await.unwrap().unwrap();
        let mut second = storage.open(Path::new("a")).await.unwrap().unwrap();

        first
            .handle
            .seek(std::io::SeekFrom::Start(3))
            .await
            .unwrap();

        let mut buf = [0u8; 2];
        second.handle.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ab");
        first.handle.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"de");
    }

    #[tokio::test]
    async fn test_removed_blob_is_absent() {
        let storage = InMemoryStorage::new();
        storage.insert("a", Bytes::from_static(b"x"));
        assert!(storage.remove(Path::new("a")).is_some());
        assert!(storage.open(Path::new("a")).await.unwrap().is_none());
    }
}
