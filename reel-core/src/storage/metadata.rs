//! Recording registry kept in memory, populated from a directory scan or a manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{MetadataStore, RecordingId, RecordingMetadata, StorageError};

/// File extensions treated as recordings during a directory scan.
const MEDIA_EXTENSIONS: &[&str] = &[
    "webm", "mp4", "m4v", "mkv", "mov", "ogv", "ogg", "opus", "mp3", "m4a", "wav",
];

/// Metadata store backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    recordings: RwLock<HashMap<RecordingId, RecordingMetadata>>,
}

impl InMemoryMetadataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a recording, returning the entry it replaced.
    pub fn register(&self, metadata: RecordingMetadata) -> Option<RecordingMetadata> {
        self.recordings.write().insert(metadata.id.clone(), metadata)
    }

    /// Removes a recording's metadata while leaving its bytes untouched.
    pub fn unregister(&self, id: &RecordingId) -> Option<RecordingMetadata> {
        self.recordings.write().remove(id)
    }

    /// Number of registered recordings.
    pub fn len(&self) -> usize {
        self.recordings.read().len()
    }

    /// Whether no recordings are registered.
    pub fn is_empty(&self) -> bool {
        self.recordings.read().is_empty()
    }

    /// Registers every media file under `dir`, recursively.
    ///
    /// The file stem becomes the recording id and the location is stored
    /// relative to `dir`. Hidden entries are skipped, and when two files share a
    /// stem the first one found wins.
    ///
    /// # Errors
    /// - `StorageError::Io` - Failed to read `dir` itself
    pub async fn scan_directory(&self, dir: &Path) -> Result<usize, StorageError> {
        let mut count = 0;
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if current == dir => return Err(e.into()),
                Err(e) => {
                    warn!("Failed to scan {}: {}", current.display(), e);
                    continue;
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if file_name.starts_with('.') {
                    continue;
                }

                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() || !is_media_file(&path) {
                    continue;
                }

                let metadata = entry.metadata().await?;
                let Some(recording) = recording_from_file(dir, &path, &metadata) else {
                    continue;
                };

                let mut recordings = self.recordings.write();
                if let Some(existing) = recordings.get(&recording.id) {
                    warn!(
                        "Skipping {}: id {} already used by {}",
                        path.display(),
                        recording.id,
                        existing.location.display()
                    );
                    continue;
                }
                debug!("Registered recording {} ({} bytes)", recording.id, recording.size);
                recordings.insert(recording.id.clone(), recording);
                count += 1;
            }
        }

        Ok(count)
    }

    /// Registers every entry of a JSON manifest (an array of recording metadata).
    ///
    /// # Errors
    /// - `StorageError::Io` - Failed to read the manifest file
    /// - `StorageError::Manifest` - The manifest is not a valid recording list
    pub async fn load_manifest(&self, path: &Path) -> Result<usize, StorageError> {
        let raw = tokio::fs::read(path).await?;
        let entries: Vec<RecordingMetadata> =
            serde_json::from_slice(&raw).map_err(|e| StorageError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let count = entries.len();
        for entry in entries {
            if let Some(previous) = self.register(entry) {
                warn!("Manifest entry {} replaced an earlier registration", previous.id);
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn lookup(&self, id: &RecordingId) -> Result<Option<RecordingMetadata>, StorageError> {
        Ok(self.recordings.read().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<RecordingMetadata>, StorageError> {
        let mut all: Vec<_> = self.recordings.read().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

fn is_media_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}

fn recording_from_file(
    root: &Path,
    path: &Path,
    metadata: &std::fs::Metadata,
) -> Option<RecordingMetadata> {
    let stem = path.file_stem()?.to_str()?;
    let id = RecordingId::new(stem).ok()?;
    let location: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let created_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Some(RecordingMetadata {
        id,
        name: path.file_name()?.to_string_lossy().into_owned(),
        size: metadata.len(),
        location,
        content_type: None,
        created_at,
    })
}
