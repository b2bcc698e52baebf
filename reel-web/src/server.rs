//! Router and listener for the playback server.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use reel_core::config::{ServerConfig, StreamingConfig};
use reel_core::streaming::{MalformedRangePolicy, TransferEngine};
use reel_core::{ObjectLocator, Result};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::stream_recording;

/// Shared state handed to every request.
///
/// Holds no per-request data; each retrieval opens its own handle.
#[derive(Clone)]
pub struct AppState {
    /// Resolves ids to stored objects
    pub locator: Arc<ObjectLocator>,
    /// Streams planned ranges
    pub engine: TransferEngine,
    /// Answer to unparseable `Range` headers
    pub malformed_range_policy: MalformedRangePolicy,
}

impl AppState {
    /// Creates state from a locator and streaming settings.
    pub fn new(locator: ObjectLocator, streaming: &StreamingConfig) -> Self {
        Self {
            locator: Arc::new(locator),
            engine: TransferEngine::new(streaming.chunk_size),
            malformed_range_policy: streaming.malformed_range_policy,
        }
    }
}

/// Builds the application router.
///
/// `/objects/{id}` is the canonical retrieval path and
/// `/api/recordings/{id}` serves the same handler for existing players.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/objects/{id}", get(stream_recording))
        .route("/api/recordings/{id}", get(stream_recording))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until the process stops.
///
/// # Errors
///
/// - `ReelError::Io` - If the address cannot be bound or the server fails
pub async fn run_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("Reel playback server running on http://{}", listener.local_addr()?);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
