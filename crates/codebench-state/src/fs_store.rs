use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageError;
use crate::schema::{PipelineCheckpoint, CHECKPOINT_VERSION};
use crate::storage_traits::*;

/// Filesystem-backed checkpoint store.
///
/// Layout: `<root>/checkpoints/<key>.json`, one pretty-printed JSON document
/// per key. Writes go to a uniquely named temp file in the same directory and
/// are renamed into place, so concurrent saves never leave a torn document.
pub struct FsCheckpointStore {
    checkpoints_dir: PathBuf,
}

impl FsCheckpointStore {
    /// Create a new `FsCheckpointStore` rooted at `root`. Creates
    /// `root/checkpoints/` if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let checkpoints_dir = root.as_ref().join("checkpoints");
        std::fs::create_dir_all(&checkpoints_dir)?;
        Ok(Self { checkpoints_dir })
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.checkpoints_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FsCheckpointStore {
    async fn load(&self, key: &str) -> StorageResult<Option<PipelineCheckpoint>> {
        validate_key(key)?;
        let bytes = match tokio::fs::read(self.document_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        let checkpoint: PipelineCheckpoint = serde_json::from_slice(&bytes)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: checkpoint.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        Ok(Some(checkpoint))
    }

    async fn save(&self, key: &str, checkpoint: &PipelineCheckpoint) -> StorageResult<()> {
        validate_key(key)?;
        let content = serde_json::to_vec_pretty(checkpoint)?;
        let path = self.document_path(key);
        let tmp = self
            .checkpoints_dir
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp, &content).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::Io(e));
        }
        debug!(
            key = %key,
            completed = checkpoint.completed_rounds.len(),
            "checkpoint written"
        );
        Ok(())
    }

    async fn clear(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.document_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DimensionScores, PipelineRoundSnapshot};

    fn make_store() -> (tempfile::TempDir, FsCheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn checkpoint(completed: usize) -> PipelineCheckpoint {
        let rounds = (0..completed)
            .map(|index| PipelineRoundSnapshot {
                index,
                overall_score: 60.0 + index as f64,
                dimension_scores: DimensionScores::from_fn(|_| 60.0),
                ija: 1.0,
                requirement_title: format!("round {index}"),
                requirement_text: Some("build a parser".to_string()),
                code_submission: Some("fn main() {}".to_string()),
                failure_reason: None,
            })
            .collect();
        PipelineCheckpoint::new(4, rounds)
    }

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let (_dir, store) = make_store();
        let written = checkpoint(2);
        store.save("pipeline-abc", &written).await.unwrap();
        let loaded = store.load("pipeline-abc").await.unwrap();
        assert_eq!(loaded, Some(written));
    }

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let (_dir, store) = make_store();
        assert!(store.load("pipeline-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (_dir, store) = make_store();
        store.save("pipeline-abc", &checkpoint(1)).await.unwrap();
        store.clear("pipeline-abc").await.unwrap();
        store.clear("pipeline-abc").await.unwrap();
        assert!(store.load("pipeline-abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files() {
        let (dir, store) = make_store();
        store.save("pipeline-abc", &checkpoint(1)).await.unwrap();
        store.save("pipeline-abc", &checkpoint(3)).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("checkpoints"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(entries, vec!["pipeline-abc.json".to_string()]);
        let loaded = store.load("pipeline-abc").await.unwrap().unwrap();
        assert_eq!(loaded.completed_rounds.len(), 3);
    }

    #[tokio::test]
    async fn unsupported_version_is_rejected() {
        let (dir, store) = make_store();
        let mut future = checkpoint(1);
        future.version = 2;
        let path = dir.path().join("checkpoints").join("pipeline-v2.json");
        std::fs::write(&path, serde_json::to_vec(&future).unwrap()).unwrap();

        let err = store.load("pipeline-v2").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion {
                found: 2,
                expected: 1
            }
        ));
    }

    #[tokio::test]
    async fn corrupt_document_is_a_serialization_error() {
        let (dir, store) = make_store();
        let path = dir.path().join("checkpoints").join("pipeline-bad.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = store.load("pipeline-bad").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
