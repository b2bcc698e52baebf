//! Bounded-chunk streaming of a planned byte range.
//!
//! The engine turns a handle and a [`TransferPlan`] into a body stream that
//! seeks once, then reads at most `chunk_size` bytes at a time until exactly
//! the planned number of bytes has been produced. The handle lives inside the
//! stream state, so it is released whenever the stream is dropped: after
//! completion, after a read error, or when the client goes away.
//!
//! Headers are committed before the first chunk is read, so a failure
//! mid-transfer cannot change the status. The stream yields the error and
//! ends, and the client observes a body shorter than `Content-Length`.

use std::io::{self, SeekFrom};
use std::ops::Range;

use axum::body::Body;
use bytes::Bytes;
use futures::{Stream, stream};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, error, trace};

use super::plan::TransferPlan;
use crate::storage::ObjectHandle;

/// Default size of each read from the backing handle.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KiB

/// Streams planned byte ranges out of object handles.
#[derive(Debug, Clone, Copy)]
pub struct TransferEngine {
    chunk_size: usize,
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl TransferEngine {
    /// Creates an engine reading `chunk_size` bytes at a time (at least one).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes read per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Stream of body chunks for `plan`, read from `handle`.
    ///
    /// Yields nothing for plans without a body. `label` identifies the
    /// transfer in logs.
    pub fn stream(
        self,
        handle: Box<dyn ObjectHandle>,
        plan: TransferPlan,
        label: String,
    ) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
        let range = plan.byte_range().unwrap_or(0..0);
        let state = TransferState::new(handle, range, self.chunk_size, label);
        stream::unfold(state, |mut state| async move {
            let item = state.next_chunk().await?;
            Some((item, state))
        })
    }

    /// Response body for `plan`, read from `handle`.
    pub fn body(self, handle: Box<dyn ObjectHandle>, plan: TransferPlan, label: String) -> Body {
        Body::from_stream(self.stream(handle, plan, label))
    }
}

struct TransferState {
    handle: Box<dyn ObjectHandle>,
    start: u64,
    remaining: u64,
    seeked: bool,
    buffer: Vec<u8>,
    guard: TransferGuard,
}

impl TransferState {
    fn new(
        handle: Box<dyn ObjectHandle>,
        range: Range<u64>,
        chunk_size: usize,
        label: String,
    ) -> Self {
        let expected = range.end.saturating_sub(range.start);
        let buffer_len = usize::try_from(expected)
            .map(|expected| expected.min(chunk_size))
            .unwrap_or(chunk_size);
        Self {
            handle,
            start: range.start,
            remaining: expected,
            seeked: false,
            buffer: vec![0; buffer_len],
            guard: TransferGuard::new(label, expected),
        }
    }

    /// Produces the next chunk, or `None` once the range is done or has failed.
    async fn next_chunk(&mut self) -> Option<Result<Bytes, io::Error>> {
        if self.guard.outcome != Outcome::InProgress {
            return None;
        }
        if self.remaining == 0 {
            self.guard.finish(Outcome::Completed);
            return None;
        }

        if !self.seeked {
            if let Err(e) = self.handle.seek(SeekFrom::Start(self.start)).await {
                return Some(Err(self.fail(e)));
            }
            self.seeked = true;
        }

        let want = usize::try_from(self.remaining)
            .map(|remaining| remaining.min(self.buffer.len()))
            .unwrap_or(self.buffer.len());

        match self.handle.read(&mut self.buffer[..want]).await {
            Ok(0) => Some(Err(self.fail(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("object ended with {} planned bytes unread", self.remaining),
            )))),
            Ok(n) => {
                self.remaining -= n as u64;
                self.guard.sent += n as u64;
                trace!(
                    "{}: sent {} bytes ({} remaining)",
                    self.guard.label, n, self.remaining
                );
                Some(Ok(Bytes::copy_from_slice(&self.buffer[..n])))
            }
            Err(e) => Some(Err(self.fail(e))),
        }
    }

    fn fail(&mut self, e: io::Error) -> io::Error {
        error!(
            "{}: read failed after {} of {} bytes, truncating response: {}",
            self.guard.label, self.guard.sent, self.guard.expected, e
        );
        self.guard.finish(Outcome::Failed);
        e
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    InProgress,
    Completed,
    Failed,
}

/// Records how a transfer ended; logs the client abort case on drop.
struct TransferGuard {
    label: String,
    expected: u64,
    sent: u64,
    outcome: Outcome,
}

impl TransferGuard {
    fn new(label: String, expected: u64) -> Self {
        Self {
            label,
            expected,
            sent: 0,
            outcome: Outcome::InProgress,
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        if outcome == Outcome::Completed {
            debug!("{}: transfer complete, {} bytes", self.label, self.sent);
        }
        self.outcome = outcome;
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        if self.outcome == Outcome::InProgress && self.sent < self.expected {
            debug!(
                "{}: client went away after {} of {} bytes",
                self.label, self.sent, self.expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    use futures::StreamExt;

    use super::*;
    use crate::storage::test_fixtures::{FailingHandle, TrackedHandle, patterned_bytes};
    use crate::streaming::range::RangeSpec;

    async fn collect(
        stream: impl Stream<Item = Result<Bytes, io::Error>>,
    ) -> (Vec<u8>, Vec<usize>, Option<io::Error>) {
        let mut body = Vec::new();
        let mut chunks = Vec::new();
        let mut failure = None;
        futures::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    chunks.push(chunk.len());
                    body.extend_from_slice(&chunk);
                }
                Err(e) => {
                    assert!(failure.is_none(), "stream continued after an error");
                    failure = Some(e);
                }
            }
        }
        (body, chunks, failure)
    }

    fn partial(start: u64, end: u64, total: u64) -> TransferPlan {
        TransferPlan::PartialContent {
            range: RangeSpec::new(start, end, total).unwrap(),
            total_length: total,
        }
    }

    #[tokio::test]
    async fn test_full_content_in_bounded_chunks() {
        let data = patterned_bytes(1000);
        let engine = TransferEngine::new(64);
        let plan = TransferPlan::FullContent { length: 1000 };

        let stream = engine.stream(Box::new(Cursor::new(data.clone())), plan, "full".to_string());
        let (body, chunks, failure) = collect(stream).await;

        assert!(failure.is_none());
        assert_eq!(body, data);
        assert!(chunks.iter().all(|&len| len <= 64));
        assert_eq!(chunks.len(), 16);
    }

    #[tokio::test]
    async fn test_partial_content_stops_at_end() {
        let data = patterned_bytes(1000);
        let engine = TransferEngine::new(30);
        let plan = partial(500, 599, 1000);

        let stream = engine.stream(
            Box::new(Cursor::new(data.clone())),
            plan,
            "partial".to_string(),
        );
        let (body, _, failure) = collect(stream).await;

        assert!(failure.is_none());
        assert_eq!(body.len(), 100);
        assert_eq!(&body[..], &data[500..600]);
    }

    #[tokio::test]
    async fn test_single_byte_range() {
        let data = patterned_bytes(10);
        let engine = TransferEngine::default();
        let plan = partial(9, 9, 10);

        let stream = engine.stream(Box::new(Cursor::new(data.clone())), plan, "one".to_string());
        let (body, chunks, _) = collect(stream).await;
        assert_eq!(body, vec![data[9]]);
        assert_eq!(chunks, vec![1]);
    }

    #[tokio::test]
    async fn test_empty_plans_yield_nothing() {
        let engine = TransferEngine::default();
        for plan in [
            TransferPlan::FullContent { length: 0 },
            TransferPlan::Unsatisfiable { total_length: 10 },
        ] {
            let stream = engine.stream(
                Box::new(Cursor::new(Bytes::new())),
                plan,
                "empty".to_string(),
            );
            let (body, chunks, failure) = collect(stream).await;
            assert!(body.is_empty() && chunks.is_empty() && failure.is_none());
        }
    }

    #[tokio::test]
    async fn test_read_error_truncates() {
        let data = patterned_bytes(1000);
        let engine = TransferEngine::new(100);
        let plan = TransferPlan::FullContent { length: 1000 };

        let handle = FailingHandle::new(data.clone(), 350);
        let stream = engine.stream(Box::new(handle), plan, "failing".to_string());
        let (body, _, failure) = collect(stream).await;

        assert!(failure.is_some());
        assert_eq!(body.len(), 350);
        assert!((body.len() as u64) < plan.content_length());
        assert_eq!(&body[..], &data[..350]);
    }

    #[tokio::test]
    async fn test_short_object_is_unexpected_eof() {
        let engine = TransferEngine::new(16);
        let plan = TransferPlan::FullContent { length: 100 };

        let stream = engine.stream(
            Box::new(Cursor::new(patterned_bytes(40))),
            plan,
            "short".to_string(),
        );
        let (body, _, failure) = collect(stream).await;

        assert_eq!(body.len(), 40);
        assert_eq!(failure.unwrap().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_dropping_stream_mid_transfer_releases_handle() {
        let engine = TransferEngine::new(10);
        let plan = TransferPlan::FullContent { length: 1000 };
        let (handle, released) = TrackedHandle::new(Cursor::new(patterned_bytes(1000)));

        let stream = engine.stream(Box::new(handle), plan, "abort".to_string());
        let mut stream = Box::pin(stream);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 10);
        assert!(!released.load(Ordering::SeqCst));

        // The server drops the body stream when the peer disconnects.
        drop(stream);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_error_releases_handle() {
        let engine = TransferEngine::new(100);
        let plan = TransferPlan::FullContent { length: 1000 };
        let (handle, released) = TrackedHandle::new(FailingHandle::new(patterned_bytes(1000), 250));

        let mut stream = Box::pin(engine.stream(Box::new(handle), plan, "failing".to_string()));
        let mut failed = false;
        while let Some(item) = stream.next().await {
            failed |= item.is_err();
        }
        assert!(failed);

        drop(stream);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_completed_transfer_releases_handle() {
        let engine = TransferEngine::new(64);
        let plan = partial(995, 997, 1000);
        let (handle, released) = TrackedHandle::new(Cursor::new(patterned_bytes(1000)));

        let stream = engine.stream(Box::new(handle), plan, "complete".to_string());
        let (body, _, failure) = collect(stream).await;

        assert!(failure.is_none());
        assert_eq!(body.len(), 3);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_chunk_size_never_zero() {
        assert_eq!(TransferEngine::new(0).chunk_size(), 1);
    }
}
