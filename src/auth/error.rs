//! Error types for credential loading and token exchange.

use thiserror::Error;

/// Errors raised while obtaining an access token.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AuthError {
    /// Raised when neither an access token nor a key file is configured.
    #[error(
        "no credentials configured: set GCP_ACCESS_TOKEN, GCP_CREDENTIALS_FILE, or GOOGLE_APPLICATION_CREDENTIALS"
    )]
    NoCredentials,
    /// Raised when the configured key file does not exist.
    #[error("service account key file not found at: {path}")]
    CredentialsNotFound {
        /// Path that was checked.
        path: String,
    },
    /// Raised when the key file cannot be read.
    #[error("failed to read service account key {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the key file is not a valid service account key.
    #[error("invalid service account key: {0}")]
    InvalidKey(String),
    /// Raised when the JWT assertion cannot be signed.
    #[error("failed to sign token assertion: {0}")]
    Signing(String),
    /// Raised when the token endpoint cannot be reached.
    #[error("token request failed: {0}")]
    Transport(String),
    /// Raised when the token endpoint rejects the assertion.
    #[error("token endpoint returned {status}: {message}")]
    TokenExchange {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the endpoint.
        message: String,
    },
}
