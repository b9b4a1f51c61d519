//! Filesystem-based checkpoint storage implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::store::{CheckpointError, CheckpointStore};
use crate::{checkpoint_file_name, TopicCheckpoint};

/// Filesystem implementation of CheckpointStore trait.
///
/// Stores one JSON file per topic partition in a directory. Saves go through a
/// synced sibling temp file and a rename, so readers never observe a
/// half-written file, not even after a power loss.
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a new FilesystemStore with the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(checkpoint_file_name(key))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> CheckpointError {
    CheckpointError::Io {
        location: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl CheckpointStore for FilesystemStore {
    async fn load(&self, key: &str) -> Result<Option<TopicCheckpoint>, CheckpointError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        let checkpoint = TopicCheckpoint::from_bytes(key, &bytes)?;
        tracing::debug!(
            checkpoint = key,
            path = %path.display(),
            position = %checkpoint.last_acked_position,
            "Loaded checkpoint"
        );
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &TopicCheckpoint) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let key = checkpoint.key();
        let path = self.path_for(&key);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = checkpoint.to_bytes()?;

        // Contents must be on disk before the rename makes them visible
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| io_error(&tmp_path, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| io_error(&tmp_path, e))?;
        file.sync_all().await.map_err(|e| io_error(&tmp_path, e))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        tracing::debug!(
            checkpoint = %key,
            path = %path.display(),
            position = %checkpoint.last_acked_position,
            "Stored checkpoint"
        );
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}
