//! Crate-level error taxonomy.
//!
//! - Validation: client-caused, detected before any write (or by the
//!   engine's structural validator), no partial state.
//! - NotFound: unknown type id/slug, instance id, or history id.
//! - Conflict: the engine rejected a write on a unique index.
//! - Provisioning: container DDL failed after its paired metadata
//!   transaction committed; carries the slug and the failed step.
//! - Engine: unexpected storage fault.

use thiserror::Error;

use crate::engine::EngineError;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The provisioning step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStep {
    /// Container creation after metadata commit
    Create,
    /// Validator replacement after a fields update
    Alter,
    /// Container drop after metadata delete
    Drop,
}

impl std::fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProvisioningStep::Create => "create",
            ProvisioningStep::Alter => "alter",
            ProvisioningStep::Drop => "drop",
        };
        f.write_str(name)
    }
}

/// Crate error type.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Client-caused invalid input; rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage engine rejected a write on a unique index.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Container DDL failed after its metadata transaction committed.
    #[error("provisioning failed for '{slug}' at step {step}: {reason}")]
    Provisioning {
        /// Slug (container name) being provisioned
        slug: String,
        /// Step that failed
        step: ProvisioningStep,
        /// Failure detail
        reason: String,
    },

    /// Unexpected storage engine fault.
    #[error("storage engine error: {0}")]
    Engine(#[from] EngineError),
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a provisioning error.
    pub fn provisioning(
        slug: impl Into<String>,
        step: ProvisioningStep,
        reason: impl Into<String>,
    ) -> Self {
        Self::Provisioning {
            slug: slug.into(),
            step,
            reason: reason.into(),
        }
    }
}

/// Maps an engine rejection of a data write onto the client-facing taxonomy.
///
/// Duplicate keys become conflicts, validator rejections become validation
/// errors; everything else is an engine fault.
pub fn map_write_error(err: EngineError) -> Error {
    match err {
        EngineError::DuplicateKey { index, collection } => Error::conflict(format!(
            "duplicate value for unique index '{index}' on '{collection}'"
        )),
        EngineError::DocumentRejected { reason, .. } => Error::Validation(reason),
        other => Error::Engine(other),
    }
}
