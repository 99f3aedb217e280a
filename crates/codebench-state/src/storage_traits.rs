//! Storage trait definitions for codebench
//!
//! `CheckpointStore` is the durable key → checkpoint mapping the pipeline
//! uses to persist and resume completed rounds. Implementations must
//! tolerate overlapping saves of a growing snapshot (last write wins) and a
//! checkpoint disappearing between `load` and `save`.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::PipelineCheckpoint;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Durable checkpoint storage keyed by a caller-supplied key.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint stored under `key`. Returns `Ok(None)` if absent.
    async fn load(&self, key: &str) -> StorageResult<Option<PipelineCheckpoint>>;

    /// Store `checkpoint` under `key`, replacing any previous value.
    async fn save(&self, key: &str, checkpoint: &PipelineCheckpoint) -> StorageResult<()>;

    /// Remove the checkpoint stored under `key`. No-op if absent.
    async fn clear(&self, key: &str) -> StorageResult<()>;
}

/// Reject keys that are empty or contain anything beyond `[A-Za-z0-9._-]`.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}
