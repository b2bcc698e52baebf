//! HTTP request handlers

pub mod recordings;

pub use recordings::stream_recording;
