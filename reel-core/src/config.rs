//! Centralized configuration for Reel.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;

use crate::streaming::{DEFAULT_CHUNK_SIZE, MalformedRangePolicy};

/// Central configuration for all Reel components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct ReelConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub streaming: StreamingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    /// TCP port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where recordings and their metadata come from.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory scanned for recording files; relative storage locations resolve against it
    pub recordings_dir: PathBuf,
    /// Optional JSON manifest describing recordings explicitly
    pub manifest_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from("uploads"),
            manifest_path: None,
        }
    }
}

/// Partial-content streaming behavior.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Size of each read from the backing handle
    pub chunk_size: usize,
    /// What to do with a `Range` header that does not parse
    pub malformed_range_policy: MalformedRangePolicy,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            malformed_range_policy: MalformedRangePolicy::Lenient,
        }
    }
}

impl ReelConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("REEL_HOST")
            && !host.is_empty()
        {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("REEL_PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.server.port = port;
        }

        if let Ok(dir) = std::env::var("REEL_RECORDINGS_DIR")
            && !dir.is_empty()
        {
            config.storage.recordings_dir = PathBuf::from(dir);
        }

        if let Ok(manifest) = std::env::var("REEL_MANIFEST")
            && !manifest.is_empty()
        {
            config.storage.manifest_path = Some(PathBuf::from(manifest));
        }

        if let Ok(chunk_size) = std::env::var("REEL_CHUNK_SIZE")
            && let Ok(size) = chunk_size.parse::<usize>()
            && size > 0
        {
            config.streaming.chunk_size = size;
        }

        if let Ok(policy) = std::env::var("REEL_MALFORMED_RANGE")
            && let Ok(policy) = policy.parse::<MalformedRangePolicy>()
        {
            config.streaming.malformed_range_policy = policy;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Uses a tiny chunk size so that multi-chunk transfers are exercised
    /// even with small fixtures.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            streaming: StreamingConfig {
                chunk_size: 7,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ReelConfig::default();

        assert_eq!(config.server.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.storage.recordings_dir, PathBuf::from("uploads"));
        assert!(config.storage.manifest_path.is_none());
        assert_eq!(config.streaming.chunk_size, 64 * 1024);
        assert_eq!(
            config.streaming.malformed_range_policy,
            MalformedRangePolicy::Lenient
        );
    }

    #[test]
    fn test_testing_preset() {
        let config = ReelConfig::for_testing();
        assert_eq!(config.server.port, 0);
        assert!(config.streaming.chunk_size < 64);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("REEL_PORT", "8088");
            std::env::set_var("REEL_RECORDINGS_DIR", "/srv/recordings");
            std::env::set_var("REEL_CHUNK_SIZE", "4096");
            std::env::set_var("REEL_MALFORMED_RANGE", "reject");
        }

        let config = ReelConfig::from_env();

        assert_eq!(config.server.port, 8088);
        assert_eq!(
            config.storage.recordings_dir,
            PathBuf::from("/srv/recordings")
        );
        assert_eq!(config.streaming.chunk_size, 4096);
        assert_eq!(
            config.streaming.malformed_range_policy,
            MalformedRangePolicy::Reject
        );

        // Cleanup
        unsafe {
            std::env::remove_var("REEL_PORT");
            std::env::remove_var("REEL_RECORDINGS_DIR");
            std::env::remove_var("REEL_CHUNK_SIZE");
            std::env::remove_var("REEL_MALFORMED_RANGE");
        }
    }
}
