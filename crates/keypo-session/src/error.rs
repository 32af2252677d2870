//! Error types for session authorization.

use std::fmt;

use keypo_api::ApiError;
use keypo_core::{CoreError, SignerError};
use thiserror::Error;

/// Errors raised inside an `authNeededCallback`.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The network invoked the callback without a required parameter.
    #[error("{0} is required")]
    MissingParameter(&'static str),

    /// The login message could not be built.
    #[error("message error: {0}")]
    Message(#[from] CoreError),

    /// The wallet failed to sign.
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
}

/// Errors surfaced by an access-control network client.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Client used before `connect()` or after `disconnect()`.
    #[error("not connected to the access-control network")]
    NotConnected,

    /// Connection could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// The auth callback failed.
    #[error("auth callback failed: {0}")]
    Callback(#[from] CallbackError),

    /// The wallet proof returned by the callback was rejected.
    #[error("invalid auth signature: {0}")]
    InvalidAuthSig(String),

    /// A node refused or failed the request.
    #[error("node error: {0}")]
    Node(String),
}

/// Stage of the authorization flow, attached to failures for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStage {
    ValidateRequest,
    ResolveSigner,
    FetchMetadata,
    ParseMetadata,
    BuildConditions,
    DeriveScope,
    FetchNonce,
    RequestSession,
    SignStandalone,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthStage::ValidateRequest => "validate-request",
            AuthStage::ResolveSigner => "resolve-signer",
            AuthStage::FetchMetadata => "fetch-metadata",
            AuthStage::ParseMetadata => "parse-metadata",
            AuthStage::BuildConditions => "build-conditions",
            AuthStage::DeriveScope => "derive-scope",
            AuthStage::FetchNonce => "fetch-nonce",
            AuthStage::RequestSession => "request-session",
            AuthStage::SignStandalone => "sign-standalone",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while authorizing a session.
///
/// Each variant corresponds to one stage; inner errors are carried
/// unchanged as the `source`.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// Request failed validation before any network call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The signer could not produce an address.
    #[error("signer error: {0}")]
    Signer(#[source] SignerError),

    /// Metadata could not be fetched.
    #[error("failed to fetch metadata for {identifier}: {source}")]
    MetadataFetch {
        identifier: String,
        #[source]
        source: ApiError,
    },

    /// Metadata was not valid JSON.
    #[error("failed to parse metadata for {identifier}: {source}")]
    MetadataParse {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },

    /// The access condition could not be built from the metadata.
    #[error("failed to build access condition: {0}")]
    Condition(#[source] CoreError),

    /// The resource scope could not be derived.
    #[error("failed to derive resource scope: {0}")]
    ScopeDerivation(String),

    /// The network invoked the auth callback without a required parameter.
    #[error("auth callback parameter missing: {0} is required")]
    CallbackParameter(&'static str),

    /// Pass-through failure from the access-control network.
    #[error("access-control network error during {stage}: {source}")]
    Network {
        stage: AuthStage,
        #[source]
        source: NetworkError,
    },

    /// The standalone authorization signature could not be produced.
    #[error("failed to sign standalone authorization: {0}")]
    Signing(#[source] CallbackError),
}

impl AuthorizationError {
    /// The stage that failed.
    pub fn stage(&self) -> AuthStage {
        match self {
            AuthorizationError::InvalidRequest(_) => AuthStage::ValidateRequest,
            AuthorizationError::Signer(_) => AuthStage::ResolveSigner,
            AuthorizationError::MetadataFetch { .. } => AuthStage::FetchMetadata,
            AuthorizationError::MetadataParse { .. } => AuthStage::ParseMetadata,
            AuthorizationError::Condition(_) => AuthStage::BuildConditions,
            AuthorizationError::ScopeDerivation(_) => AuthStage::DeriveScope,
            AuthorizationError::CallbackParameter(_) => AuthStage::RequestSession,
            AuthorizationError::Network { stage, .. } => *stage,
            AuthorizationError::Signing(_) => AuthStage::SignStandalone,
        }
    }
}

/// Result type for authorization.
pub type Result<T> = std::result::Result<T, AuthorizationError>;
