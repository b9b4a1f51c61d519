//! Checkpoint storage selection.

use std::path::PathBuf;
use std::sync::Arc;

use crate::store::{CheckpointError, CheckpointStore};
use crate::{FilesystemStore, MemoryStore, S3Store};

/// Where checkpoints are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointStorage {
    /// Local directory
    Filesystem { dir: PathBuf },
    /// S3 bucket and key prefix
    S3 { bucket: String, prefix: String },
    /// Process memory; nothing survives a restart
    Memory,
}

impl CheckpointStorage {
    /// Parse a configured checkpoint location.
    ///
    /// - `s3://bucket/prefix/` → [`CheckpointStorage::S3`]
    /// - `memory://` → [`CheckpointStorage::Memory`]
    /// - anything else is a local directory
    pub fn parse(location: &str) -> Result<Self, CheckpointError> {
        if let Some(rest) = location.strip_prefix("s3://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(CheckpointError::InvalidLocation(location.to_string()));
            }
            return Ok(CheckpointStorage::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            });
        }

        if location == "memory://" {
            return Ok(CheckpointStorage::Memory);
        }

        if location.is_empty() {
            return Err(CheckpointError::InvalidLocation(location.to_string()));
        }

        Ok(CheckpointStorage::Filesystem {
            dir: PathBuf::from(location),
        })
    }

    /// Open the backend this location refers to.
    pub async fn open(&self) -> Arc<dyn CheckpointStore> {
        match self {
            CheckpointStorage::Filesystem { dir } => Arc::new(FilesystemStore::new(dir.clone())),
            CheckpointStorage::S3 { bucket, prefix } => {
                Arc::new(S3Store::new(bucket.clone(), prefix.clone()).await)
            }
            CheckpointStorage::Memory => Arc::new(MemoryStore::new()),
        }
    }
}

impl std::fmt::Display for CheckpointStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckpointStorage::Filesystem { dir } => write!(f, "{}", dir.display()),
            CheckpointStorage::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
            CheckpointStorage::Memory => write!(f, "memory://"),
        }
    }
}
