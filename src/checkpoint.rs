//! The `checkpoint` command: show the stored checkpoint of one topic partition.

use anyhow::Context;
use checkpoint::{checkpoint_key, CheckpointStore};

/// One-line description of the checkpoint of `topic` at `partition`, or
/// "no checkpoint".
pub async fn describe_checkpoint(
    store: &dyn CheckpointStore,
    topic: &str,
    partition: i32,
) -> anyhow::Result<String> {
    let key = checkpoint_key(topic, partition);
    let checkpoint = store
        .load(&key)
        .await
        .with_context(|| format!("Failed to load checkpoint from {}", store.describe(&key)))?;

    Ok(match checkpoint {
        Some(c) => format!("{} updated={}", c.to_cli_string(), c.updated_at.to_rfc3339()),
        None => format!("{key} no checkpoint"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint::{FilesystemStore, TopicCheckpoint};
    use sync_core::Position;

    #[tokio::test]
    async fn test_describe_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());

        assert_eq!(
            describe_checkpoint(&store, "gps_data", 0).await.unwrap(),
            "gps_data-0 no checkpoint"
        );

        store
            .save(&TopicCheckpoint::new("gps_data", Position::new(1, 7), None))
            .await
            .unwrap();
        let line = describe_checkpoint(&store, "gps_data", 1).await.unwrap();
        assert!(line.starts_with("gps_data position=1@7 watermark=none updated="));
        assert_eq!(
            describe_checkpoint(&store, "gps_data", 0).await.unwrap(),
            "gps_data-0 no checkpoint"
        );
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gps_data-0.json"), "not json").unwrap();
        let store = FilesystemStore::new(dir.path());

        let err = describe_checkpoint(&store, "gps_data", 0).await.unwrap_err();
        assert!(format!("{err:#}").contains("corrupt"));
    }
}
