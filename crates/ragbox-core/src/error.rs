//! Error types for remote store operations.

use thiserror::Error;

/// Result type for store and coordinator operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a [`DocumentStore`](crate::store::DocumentStore).
///
/// None of these are retried internally. A caller that wants retries can
/// check [`StoreError::is_retryable`] and call again; the coordinator never
/// mutates its cache on a failed call, so repeating one is always safe.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection refused, DNS failure, reset, or similar.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The store answered with a non-success status.
    #[error("remote store returned {status}: {body}")]
    Status {
        /// HTTP-style status code.
        status: u16,
        /// Raw response body, for diagnostics.
        body: String,
    },

    /// The response body could not be decoded into the expected record.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The request was rejected before it was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Client misconfiguration (bad base URL, TLS setup, ...).
    #[error("client configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Build a [`StoreError::Status`] from a code and message.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        StoreError::Status {
            status,
            body: body.into(),
        }
    }

    /// Build a 404 status error.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::status(404, body)
    }

    /// Build a 400 status error.
    pub fn bad_request(body: impl Into<String>) -> Self {
        Self::status(400, body)
    }

    /// Status code carried by this error, if it came from the store.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a retry might succeed: transport errors, timeouts,
    /// 429, and 5xx statuses.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport(_) | StoreError::Timeout(_) => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
            StoreError::Decode(_) | StoreError::InvalidRequest(_) | StoreError::Config(_) => false,
        }
    }
}
