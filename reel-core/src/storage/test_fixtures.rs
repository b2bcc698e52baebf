//! Test fixtures for storage and streaming tests.
//!
//! Provides an in-memory recording library and handles that fail on demand,
//! so that retrieval can be exercised end to end without touching disk.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

use super::{
    InMemoryMetadataStore, InMemoryStorage, ObjectLocator, ObjectStorage, OpenedObject,
    RecordingId, RecordingMetadata, StorageError,
};

/// Deterministic content where neighbouring offsets hold different bytes.
pub fn patterned_bytes(len: usize) -> Bytes {
    (0..len)
        .map(|i| ((i * 31 + 7) % 251) as u8)
        .collect::<Vec<_>>()
        .into()
}

/// Metadata for a `.webm` recording stored under `<id>.webm`.
///
/// # Panics
///
/// Panics if `id` is not a valid recording id.
pub fn webm_metadata(id: &str, size: u64) -> RecordingMetadata {
    RecordingMetadata {
        id: RecordingId::new(id).unwrap(),
        name: format!("{id}.webm"),
        size,
        location: PathBuf::from(format!("{id}.webm")),
        content_type: None,
        created_at: Utc::now(),
    }
}

/// In-memory metadata and storage wired into a locator.
#[derive(Debug, Default, Clone)]
pub struct FixtureLibrary {
    /// Registered recordings
    pub metadata: Arc<InMemoryMetadataStore>,
    /// Stored bytes, keyed by recording location
    pub storage: Arc<InMemoryStorage>,
}

impl FixtureLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a recording whose stored bytes are `data`.
    pub fn add(&self, id: &str, data: impl Into<Bytes>) -> RecordingId {
        let data = data.into();
        let metadata = webm_metadata(id, data.len() as u64);
        self.storage.insert(metadata.location.clone(), data);
        let id = metadata.id.clone();
        self.metadata.register(metadata);
        id
    }

    /// Registers metadata for a recording whose bytes were never stored.
    pub fn add_metadata_only(&self, id: &str, size: u64) -> RecordingId {
        let metadata = webm_metadata(id, size);
        let id = metadata.id.clone();
        self.metadata.register(metadata);
        id
    }

    /// Locator over this library.
    pub fn locator(&self) -> ObjectLocator {
        ObjectLocator::new(self.metadata.clone(), self.storage.clone())
    }
}

/// Handle over in-memory bytes whose reads fail once `fail_at` is reached.
#[derive(Debug)]
pub struct FailingHandle {
    data: Bytes,
    position: u64,
    fail_at: u64,
}

impl FailingHandle {
    /// Creates a handle that serves bytes before offset `fail_at`, then errors.
    pub fn new(data: Bytes, fail_at: u64) -> Self {
        Self {
            data,
            position: 0,
            fail_at,
        }
    }
}

impl AsyncRead for FailingHandle {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.position >= self.fail_at {
            return Poll::Ready(Err(io::Error::other("injected read failure")));
        }

        let len = self.data.len() as u64;
        if self.position >= len {
            return Poll::Ready(Ok(()));
        }

        let end = len
            .min(self.fail_at)
            .min(self.position + buf.remaining() as u64);
        buf.put_slice(&self.data[self.position as usize..end as usize]);
        self.position = end;
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for FailingHandle {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let len = self.data.len() as i64;
        let target = match position {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => self.position as i64 + delta,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start",
            ));
        }
        self.position = target as u64;
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.position))
    }
}

/// Wraps a handle and records when it is dropped.
#[derive(Debug)]
pub struct TrackedHandle<H> {
    inner: H,
    released: Arc<AtomicBool>,
}

impl<H> TrackedHandle<H> {
    /// Wraps `inner`; the returned flag turns true once the handle is dropped.
    pub fn new(inner: H) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let handle = Self {
            inner,
            released: released.clone(),
        };
        (handle, released)
    }
}

impl<H> Drop for TrackedHandle<H> {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl<H: AsyncRead + Unpin> AsyncRead for TrackedHandle<H> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<H: AsyncSeek + Unpin> AsyncSeek for TrackedHandle<H> {
    fn start_seek(mut self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.inner).start_seek(position)
    }

    fn poll_complete(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.inner).poll_complete(cx)
    }
}

/// Storage whose handles fail after a fixed offset.
#[derive(Debug, Default)]
pub struct FailingStorage {
    objects: RwLock<Vec<(PathBuf, Bytes, u64)>>,
}

impl FailingStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` at `location`; reads at or beyond `fail_at` will error.
    pub fn insert(&self, location: impl Into<PathBuf>, data: Bytes, fail_at: u64) {
        self.objects.write().push((location.into(), data, fail_at));
    }
}

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn open(&self, location: &Path) -> Result<Option<OpenedObject>, StorageError> {
        let objects = self.objects.read();
        let Some((_, data, fail_at)) = objects.iter().find(|(path, _, _)| path == location) else {
            return Ok(None);
        };
        Ok(Some(OpenedObject {
            handle: Box::new(FailingHandle::new(data.clone(), *fail_at)),
            length: data.len() as u64,
        }))
    }
}
