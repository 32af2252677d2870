//! reqwest client for the metadata and decryption endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use keypo_core::{DataIdentifier, DataMetadata, SessionSigs};

use crate::error::{ApiError, Result};

/// Path of the metadata lookup endpoint.
pub const FILE_METADATA_PATH: &str = "/graph/fileMetadata";

/// Path of the decryption endpoint.
pub const DECRYPTION_PATH: &str = "/decryption";

/// Source of record metadata.
///
/// Returns the metadata exactly as stored: a JSON document encoded as a
/// string. Parsing is the caller's concern.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch the metadata text for `identifier`.
    async fn file_metadata(&self, identifier: &DataIdentifier) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct FileMetadataResponse {
    #[serde(rename = "fileMetadata", default)]
    file_metadata: Option<FileMetadataEnvelope>,
}

#[derive(Debug, Deserialize)]
struct FileMetadataEnvelope {
    #[serde(rename = "fileMetadata", default)]
    file_metadata: Option<Value>,
}

/// Backend that exchanges a session credential for decrypted data.
#[async_trait]
pub trait DecryptionApi: Send + Sync {
    /// Submit a decryption request and return the backend's JSON result.
    async fn decrypt(&self, request: &DecryptionRequest<'_>) -> Result<Value>;
}

/// Body of a decryption request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionRequest<'a> {
    pub data_identifier: &'a DataIdentifier,
    pub session_sigs: &'a SessionSigs,
    pub data_metadata: &'a DataMetadata,
}

/// Client for the Keypo HTTP API.
#[derive(Debug, Clone)]
pub struct MetadataApi {
    base_url: String,
    http: reqwest::Client,
}

impl MetadataApi {
    /// Create a client for `base_url` with a default HTTP client.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client using a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Result<Self> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(base_url));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// The API base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MetadataSource for MetadataApi {
    async fn file_metadata(&self, identifier: &DataIdentifier) -> Result<String> {
        let url = self.endpoint(FILE_METADATA_PATH);
        tracing::debug!(%url, %identifier, "fetching file metadata");

        let response = self
            .http
            .get(&url)
            .query(&[("fileIdentifier", identifier.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, %identifier, "metadata request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: FileMetadataResponse = serde_json::from_slice(&bytes)?;

        let missing = || ApiError::MissingField {
            field: "fileMetadata.fileMetadata",
            identifier: identifier.to_string(),
        };
        match parsed
            .file_metadata
            .ok_or_else(missing)?
            .file_metadata
            .ok_or_else(missing)?
        {
            Value::String(text) => Ok(text),
            Value::Null => Err(missing()),
            // Some deployments store the document inline rather than encoded.
            other => Ok(other.to_string()),
        }
    }
}

#[async_trait]
impl DecryptionApi for MetadataApi {
    /// `POST /decryption` with the session credential and metadata.
    async fn decrypt(&self, request: &DecryptionRequest<'_>) -> Result<Value> {
        let url = self.endpoint(DECRYPTION_PATH);
        tracing::debug!(%url, identifier = %request.data_identifier, "requesting decryption");

        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "decryption request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
