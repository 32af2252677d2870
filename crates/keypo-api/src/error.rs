//! Error types for the API client.

use thiserror::Error;

/// Errors that can occur when talking to the Keypo API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response decoded but lacked an expected field.
    #[error("missing field `{field}` for identifier {identifier}")]
    MissingField {
        field: &'static str,
        identifier: String,
    },

    /// Response body was not the expected JSON.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL could not be joined with an endpoint path.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
