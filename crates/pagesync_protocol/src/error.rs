//! Error types shared by the pagesync crates.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised synchronously by client operations.
///
/// Only caller bugs are surfaced as `Err`: malformed input and entities in
/// the wrong state for an operation. Remote failures (non-success status,
/// transport exceptions) are not errors in this taxonomy; they come back as
/// `Ok(None)` or `Ok(false)` with a retrievable last-error message on the
/// client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Malformed or missing input to a public operation.
    ///
    /// Raised before any network call. Never retryable, always a caller bug.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation invoked on an entity in an invalid state.
    ///
    /// Examples: deleting an already-trashed page, saving sidecar data that
    /// was never loaded, using an entity after its originating client was
    /// dropped.
    #[error("usage error: {0}")]
    Usage(String),
}

impl ClientError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }
}
