//! Storage engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the storage engine itself.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Target collection does not exist.
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),

    /// Collection creation attempted under an existing name.
    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    /// A write violated a unique index.
    #[error("duplicate key for index '{index}' on collection '{collection}'")]
    DuplicateKey {
        /// Collection the write targeted.
        collection: String,
        /// Name of the violated index.
        index: String,
    },

    /// A write violated the collection's structural validator.
    #[error("document rejected by validator on collection '{collection}': {reason}")]
    DocumentRejected {
        /// Collection the write targeted.
        collection: String,
        /// Violation detail.
        reason: String,
    },
}
