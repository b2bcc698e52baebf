//! Reel Web - HTTP playback server
//!
//! Serves stored recordings with byte-range support so players can seek
//! and resume without downloading whole files.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, build_router, run_server};
