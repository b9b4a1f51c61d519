//! In-memory checkpoint storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::store::{CheckpointError, CheckpointStore};
use crate::TopicCheckpoint;

/// Checkpoints kept in process memory.
///
/// Clones share the same map, so a test can hand one clone to a pipeline and
/// inspect (or pre-seed) state through another. A "restarted" pipeline given a
/// clone of the same store resumes exactly like one reading from disk.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, TopicCheckpoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the checkpoint stored under `key`.
    pub fn get(&self, key: &str) -> Option<TopicCheckpoint> {
        self.lock().get(key).cloned()
    }

    /// Store a checkpoint without going through the async trait.
    pub fn insert(&self, checkpoint: TopicCheckpoint) {
        self.lock().insert(checkpoint.key(), checkpoint);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, TopicCheckpoint>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<TopicCheckpoint>, CheckpointError> {
        Ok(self.get(key))
    }

    async fn save(&self, checkpoint: &TopicCheckpoint) -> Result<(), CheckpointError> {
        self.insert(checkpoint.clone());
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}
