//! File-system backed object storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;

use super::{ObjectStorage, OpenedObject, StorageError};

/// Opens recordings as plain files.
///
/// Relative locations resolve against `root` when one is configured,
/// otherwise against the process working directory.
#[derive(Debug, Clone, Default)]
pub struct FileSystemStorage {
    root: Option<PathBuf>,
}

impl FileSystemStorage {
    /// Creates storage that resolves relative locations against the working directory.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Creates storage that resolves relative locations against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, location: &Path) -> PathBuf {
        match &self.root {
            Some(root) if location.is_relative() => root.join(location),
            _ => location.to_path_buf(),
        }
    }
}

#[async_trait]
impl ObjectStorage for FileSystemStorage {
    async fn open(&self, location: &Path) -> Result<Option<OpenedObject>, StorageError> {
        let path = self.resolve(location);

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(OpenedObject {
            handle: Box::new(file),
            length: metadata.len(),
        }))
    }
}
