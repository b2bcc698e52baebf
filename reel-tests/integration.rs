//! Integration tests for Reel
//!
//! These drive the full router in-process, and over a real socket where
//! connection behavior matters.

#[path = "integration/range_requests.rs"]
mod range_requests;

#[path = "integration/object_lookup.rs"]
mod object_lookup;

#[path = "integration/transfer_failures.rs"]
mod transfer_failures;

#[path = "integration/live_server.rs"]
mod live_server;
