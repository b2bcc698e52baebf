//! Reel Core - Recording storage and partial-content streaming
//!
//! This crate provides the building blocks for serving stored recordings
//! over HTTP: object location, range request parsing, response planning,
//! bounded-chunk streaming transfer, and configuration management.

pub mod config;
pub mod storage;
pub mod streaming;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::ReelConfig;
pub use storage::{
    LocateError, MetadataStore, ObjectLocator, ObjectStorage, RecordingId, RecordingMetadata,
    StorageError, StoredObject,
};
pub use streaming::{MalformedRangePolicy, RangeParse, RangeSpec, TransferEngine, TransferPlan};

/// Errors raised while starting Reel: tracing setup and the listener.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReelError>;
