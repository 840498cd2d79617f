//! Error types for the Compute Engine client.

use thiserror::Error;

use crate::api::ApiError;
use crate::backend::BackendError;

/// Errors raised by the Compute Engine client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ComputeError {
    /// Raised when a request is missing a required field.
    #[error("invalid instance request: {0}")]
    Validation(String),
    /// Raised when an operation finishes with errors.
    #[error("operation {operation} failed: {message}")]
    OperationFailed {
        /// Operation name.
        operation: String,
        /// Joined provider error messages.
        message: String,
    },
    /// Raised when an operation does not finish before the timeout.
    #[error("timeout waiting for operation {operation} in zone {zone}")]
    Timeout {
        /// Operation name.
        operation: String,
        /// Zone the operation runs in.
        zone: String,
    },
    /// Wrapper for API level failures.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<BackendError> for ComputeError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Validation(field) => Self::Validation(field),
        }
    }
}
