//! codebench-state: checkpoint persistence for codebench
//!
//! This crate provides the persistence layer for benchmark pipeline runs.
//! It owns the on-disk checkpoint schema and the storage abstraction the
//! orchestrator resumes from.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: durable, resumable snapshots of completed rounds.
//!
//! ## Key Components
//!
//! - `CheckpointStore`: async load/save/clear keyed by a caller-supplied key
//! - `PipelineCheckpoint` / `PipelineRoundSnapshot`: persisted schema
//! - `FsCheckpointStore`: JSON documents on local disk
//! - `fakes::MemoryCheckpointStore`: in-memory store for tests

mod error;
pub mod fakes;
mod fs_store;
pub mod schema;
pub mod storage_traits;

pub use error::StorageError;
pub use fs_store::FsCheckpointStore;
pub use schema::{
    DimensionKey, DimensionScores, PipelineCheckpoint, PipelineRoundSnapshot, CHECKPOINT_VERSION,
};
pub use storage_traits::{validate_key, CheckpointStore, StorageResult};
