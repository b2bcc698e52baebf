//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use reel_core::config::ReelConfig;
use reel_core::storage::{FileSystemStorage, InMemoryMetadataStore};
use reel_core::streaming::MalformedRangePolicy;
use reel_core::{MetadataStore, ObjectLocator};
use reel_web::{AppState, run_server};
use tracing::{info, warn};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the playback server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory of recordings to scan and serve
        #[arg(short, long)]
        recordings_dir: Option<PathBuf>,
        /// JSON manifest of recordings to register in addition to the scan
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Answer unparseable Range headers with 400 instead of the full recording
        #[arg(long)]
        reject_malformed_ranges: bool,
    },
    /// List the recordings a directory would serve
    Scan {
        /// Directory to scan
        dir: PathBuf,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the underlying storage or server error with context
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            recordings_dir,
            manifest,
            reject_malformed_ranges,
        } => {
            let mut config = ReelConfig::from_env();
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(dir) = recordings_dir {
                config.storage.recordings_dir = dir;
            }
            if manifest.is_some() {
                config.storage.manifest_path = manifest;
            }
            if reject_malformed_ranges {
                config.streaming.malformed_range_policy = MalformedRangePolicy::Reject;
            }
            serve(config).await
        }
        Commands::Scan { dir } => scan(dir).await,
    }
}

/// Registers recordings from the configured sources and runs the server.
///
/// # Errors
/// - Manifest cannot be read or decoded
/// - Listener cannot be bound
pub async fn serve(config: ReelConfig) -> anyhow::Result<()> {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let recordings_dir = &config.storage.recordings_dir;

    match metadata.scan_directory(recordings_dir).await {
        Ok(count) => info!("Found {} recordings in {}", count, recordings_dir.display()),
        Err(e) => warn!(
            "Could not scan recordings directory {}: {}",
            recordings_dir.display(),
            e
        ),
    }

    if let Some(manifest) = &config.storage.manifest_path {
        let count = metadata
            .load_manifest(manifest)
            .await
            .with_context(|| format!("loading manifest {}", manifest.display()))?;
        info!("Registered {} recordings from {}", count, manifest.display());
    }

    let storage = Arc::new(FileSystemStorage::with_root(recordings_dir));
    let state = AppState::new(ObjectLocator::new(metadata, storage), &config.streaming);

    run_server(&config.server, state)
        .await
        .context("playback server failed")
}

/// Prints every recording found under `dir`.
///
/// # Errors
/// - `dir` cannot be read
pub async fn scan(dir: PathBuf) -> anyhow::Result<()> {
    let metadata = InMemoryMetadataStore::new();
    let count = metadata
        .scan_directory(&dir)
        .await
        .with_context(|| format!("scanning {}", dir.display()))?;

    println!("{count} recordings in {}", dir.display());
    for recording in metadata.list().await? {
        println!(
            "  {:<40} {:>12} bytes  {:<12} {}",
            recording.id,
            recording.size,
            recording.content_type(),
            recording.location.display()
        );
    }
    Ok(())
}
