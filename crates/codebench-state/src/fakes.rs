//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryCheckpointStore`, which satisfies the `CheckpointStore`
//! contract without touching the filesystem and records how often it was
//! written to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::schema::PipelineCheckpoint;
use crate::storage_traits::*;

/// In-memory checkpoint store backed by a `HashMap<key, checkpoint>`.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: Mutex<HashMap<String, PipelineCheckpoint>>,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `checkpoint` under `key`.
    pub fn with_checkpoint(key: &str, checkpoint: PipelineCheckpoint) -> Self {
        let store = Self::default();
        store
            .checkpoints
            .lock()
            .unwrap()
            .insert(key.to_string(), checkpoint);
        store
    }

    /// Current value under `key`, bypassing the async trait.
    pub fn peek(&self, key: &str) -> Option<PipelineCheckpoint> {
        self.checkpoints.lock().unwrap().get(key).cloned()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of `clear` calls.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, key: &str) -> StorageResult<Option<PipelineCheckpoint>> {
        validate_key(key)?;
        let checkpoints = self.checkpoints.lock().unwrap();
        Ok(checkpoints.get(key).cloned())
    }

    async fn save(&self, key: &str, checkpoint: &PipelineCheckpoint) -> StorageResult<()> {
        validate_key(key)?;
        let mut checkpoints = self.checkpoints.lock().unwrap();
        checkpoints.insert(key.to_string(), checkpoint.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let mut checkpoints = self.checkpoints.lock().unwrap();
        checkpoints.remove(key);
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
