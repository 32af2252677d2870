//! # Keypo API
//!
//! HTTP client for the Keypo backend:
//!
//! - `GET  {api}/graph/fileMetadata?fileIdentifier={id}` → record metadata
//! - `POST {api}/decryption` → decryption result
//!
//! The [`MetadataSource`] and [`DecryptionApi`] traits are the seams the
//! authorizer and facade depend on; [`MetadataApi`] implements both.

pub mod client;
pub mod error;

pub use client::{
    DecryptionApi, DecryptionRequest, MetadataApi, MetadataSource, DECRYPTION_PATH,
    FILE_METADATA_PATH,
};
pub use error::{ApiError, Result};
