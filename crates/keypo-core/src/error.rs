//! Error types for core primitives.

use thiserror::Error;

/// Errors that can occur while building or validating core values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required string value was empty.
    #[error("{0} must not be empty")]
    EmptyValue(&'static str),

    /// Malformed EVM address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed private key material.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Signature could not be parsed or recovered.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// Recovered signer does not match the claimed address.
    #[error("signature address mismatch: expected {expected}, recovered {recovered}")]
    AddressMismatch { expected: String, recovered: String },

    /// Ability requested on a resource kind it does not apply to.
    #[error("ability does not apply to resource: {0}")]
    AbilityMismatch(String),

    /// Malformed ReCap resource.
    #[error("invalid recap: {0}")]
    InvalidRecap(String),

    /// A condition set with no conditions.
    #[error("condition set is empty")]
    EmptyConditions,

    /// Malformed timestamp.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by a [`Signer`](crate::wallet::Signer).
#[derive(Debug, Error)]
pub enum SignerError {
    /// The signer has no account available (e.g. wallet not yet provisioned).
    #[error("signer unavailable: {0}")]
    Unavailable(String),

    /// The user or provider refused to sign.
    #[error("signing rejected: {0}")]
    Rejected(String),

    /// Key material failure.
    #[error("key error: {0}")]
    Key(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
