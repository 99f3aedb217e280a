//! Error types for codebench-state

use thiserror::Error;

/// Errors returned by [`CheckpointStore`](crate::CheckpointStore) implementations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Checkpoint keys are used as file names and must stay path-safe
    #[error("invalid checkpoint key: {key:?}")]
    InvalidKey { key: String },

    /// Stored document uses a schema version this build does not read
    #[error("unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Serialization error
    #[error("checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("checkpoint io failed: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("checkpoint backend error: {0}")]
    Backend(String),
}
