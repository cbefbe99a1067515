//! Storage trait abstraction.

use async_trait::async_trait;
use petquest_core::{EngineError, MissionProgress, ProgressId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stale write: the stored version is not the one the writer saw
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict {
        /// Version the writer expected to replace
        expected: u64,
        /// Version actually stored
        found: u64,
    },

    /// Item not found
    #[error("not found: {0}")]
    NotFound(ProgressId),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { expected, found } => {
                EngineError::ConcurrencyConflict { expected, found }
            }
            StoreError::NotFound(id) => EngineError::NotFound(id.to_string()),
            other => EngineError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction for progress snapshots.
///
/// This trait allows different storage backends to be plugged in.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Persist a snapshot (create or update).
    ///
    /// `progress.version` is the version being written; the write succeeds
    /// only when the stored version is exactly one less (or the instance is
    /// new and `progress.version` is 1). Returns the stored version.
    async fn save(&self, progress: &MissionProgress) -> Result<u64>;

    /// Load a snapshot by id.
    async fn load(&self, id: ProgressId) -> Result<Option<MissionProgress>>;

    /// List all stored snapshots.
    async fn list(&self) -> Result<Vec<MissionProgress>>;
}
