//! Error types for the Keypo facade.

use keypo_api::ApiError;
use keypo_core::{CoreError, SignerError};
use keypo_session::{AuthorizationError, NetworkError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::status::StatusError;

/// Errors that can occur during Keypo operations.
#[derive(Debug, Error)]
pub enum KeypoError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session authorization failed.
    #[error("authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// Network lifecycle error.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Backend API error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Decrypt status conflict.
    #[error("status error: {0}")]
    Status(#[from] StatusError),

    /// Wallet error.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    /// Invalid value.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// The encryption SDK failed.
    #[error("encryption sdk error: {0:#}")]
    Sdk(anyhow::Error),
}

/// Result type for Keypo operations.
pub type Result<T> = std::result::Result<T, KeypoError>;
