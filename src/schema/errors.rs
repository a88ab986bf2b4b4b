//! Schema error types.

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Violations of a compiled validation contract.
///
/// These are produced when a document is checked against a contract at
/// write time; they are client-caused.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// A required field is absent.
    #[error("field '{field}': required field is missing")]
    MissingRequired {
        /// Field name
        field: String,
    },

    /// The document carries an undeclared field.
    #[error("field '{field}': no such field is declared")]
    UnknownField {
        /// Field name
        field: String,
    },

    /// A value does not match its declared type.
    #[error("field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field path (array elements as `field[i]`)
        field: String,
        /// Expected type name
        expected: &'static str,
        /// Actual JSON type name
        actual: &'static str,
    },

    /// Null is never a valid field value.
    #[error("field '{field}': null is not a valid value")]
    NullValue {
        /// Field path
        field: String,
    },

    /// An integer value does not fit the 32-bit range.
    #[error("field '{field}': integer out of 32-bit range")]
    IntOutOfRange {
        /// Field path
        field: String,
    },
}
