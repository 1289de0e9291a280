//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A record with the same key already exists.
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic concurrency check failed.
    ///
    /// Another writer updated the record since it was read. The caller
    /// should re-fetch and decide whether its write is still meaningful.
    #[error("concurrent modification of {id}: expected version {expected}, found {actual}")]
    Conflict {
        /// Record key.
        id: String,
        /// Version the writer read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Serialization failure while persisting or loading a record.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend-specific failure (connection loss, I/O, ...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` for conflicts, which callers may surface as benign
    /// "already processed" results rather than failures.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_detectable() {
        let err = StoreError::Conflict {
            id: "j1".into(),
            expected: 1,
            actual: 2,
        };
        assert!(err.is_conflict());
        assert!(err.to_string().contains("expected version 1"));
    }

    #[test]
    fn not_found_is_not_conflict() {
        assert!(!StoreError::NotFound("j1".into()).is_conflict());
    }
}
