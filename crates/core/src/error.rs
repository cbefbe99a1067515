//! Error taxonomy of the progression engine.

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the progression engine.
///
/// Legitimate verification failures are not errors: `submit_step` reports
/// them as a value so the caller can resubmit. The variants here are caller
/// faults, races, or infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed evidence shape; the caller's fault, not retried here
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation invalid for the current state
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// Stale version on persistence write-back
    #[error("concurrency conflict: expected version {expected}, found {found}")]
    ConcurrencyConflict {
        /// Version the writer expected to replace
        expected: u64,
        /// Version actually stored
        found: u64,
    },

    /// Submission arrived after the mission's deadline passed
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Unknown progress instance
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence failure
    #[error("storage error: {0}")]
    Storage(String),
}
