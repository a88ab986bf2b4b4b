//! REST API error mapping.
//!
//! Validation and schema violations are client-caused (422), conflicts are
//! client-caused but distinct (409), provisioning and engine faults are
//! server-caused (500).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::error::Error;

/// Result type for REST handlers.
pub type RestResult<T> = Result<T, RestError>;

/// Errors leaving the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum RestError {
    /// Malformed path segment (id or history id)
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Core error carried through
    #[error(transparent)]
    Core(#[from] Error),
}

impl RestError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::InvalidIdentifier(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RestError::Core(Error::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            RestError::Core(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            RestError::Core(Error::Conflict(_)) => StatusCode::CONFLICT,
            RestError::Core(Error::Provisioning { .. }) | RestError::Core(Error::Engine(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error body shape.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    detail: String,
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            RestError::InvalidIdentifier(_) => "invalid_identifier",
            RestError::Core(Error::Validation(_)) => "validation_error",
            RestError::Core(Error::NotFound(_)) => "not_found",
            RestError::Core(Error::Conflict(_)) => "conflict",
            RestError::Core(Error::Provisioning { .. }) => "provisioning_error",
            RestError::Core(Error::Engine(_)) => "engine_error",
        };
        let body = ErrorBody {
            error: error.to_string(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisioningStep;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RestError::Core(Error::validation("x")).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RestError::Core(Error::not_found("x")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RestError::Core(Error::conflict("x")).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RestError::Core(Error::provisioning("s", ProvisioningStep::Create, "boom"))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
