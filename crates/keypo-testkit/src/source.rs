//! A scripted stand-in for the Keypo HTTP API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use keypo_api::{ApiError, DecryptionApi, DecryptionRequest, MetadataSource};
use keypo_core::DataIdentifier;

/// What the source answers for one identifier.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Metadata text, returned verbatim.
    Metadata(String),
    /// A non-success HTTP status.
    Status(u16),
}

/// In-memory metadata and decryption API.
///
/// Unknown identifiers answer 404. Every decryption request is recorded.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, Scripted>>,
    fetches: AtomicUsize,
    decryptions: Mutex<Vec<Value>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `identifier` with `metadata` encoded as JSON text.
    pub fn with_metadata(self, identifier: &str, metadata: &Value) -> Self {
        self.with_raw(identifier, metadata.to_string())
    }

    /// Answer `identifier` with arbitrary text, valid JSON or not.
    pub fn with_raw(self, identifier: &str, text: impl Into<String>) -> Self {
        self.script(identifier, Scripted::Metadata(text.into()));
        self
    }

    /// Answer `identifier` with an HTTP error status.
    pub fn with_status(self, identifier: &str, status: u16) -> Self {
        self.script(identifier, Scripted::Status(status));
        self
    }

    /// Set or replace the answer for `identifier`.
    pub fn script(&self, identifier: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .insert(identifier.to_string(), response);
    }

    /// Number of metadata lookups served.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Decryption request bodies received, in order.
    pub fn decryption_requests(&self) -> Vec<Value> {
        self.decryptions.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataSource for ScriptedSource {
    async fn file_metadata(&self, identifier: &DataIdentifier) -> keypo_api::Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let response = self.responses.lock().unwrap().get(identifier.as_str()).cloned();
        match response {
            Some(Scripted::Metadata(text)) => Ok(text),
            Some(Scripted::Status(status)) => Err(ApiError::Status {
                status,
                body: String::new(),
            }),
            None => Err(ApiError::Status {
                status: 404,
                body: format!("no metadata for {identifier}"),
            }),
        }
    }
}

#[async_trait]
impl DecryptionApi for ScriptedSource {
    async fn decrypt(&self, request: &DecryptionRequest<'_>) -> keypo_api::Result<Value> {
        let body = serde_json::to_value(request)?;
        self.decryptions.lock().unwrap().push(body);
        Ok(json!({
            "dataIdentifier": request.data_identifier,
            "decrypted": true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DataIdentifier {
        DataIdentifier::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_scripted_answers() {
        let source = ScriptedSource::new()
            .with_raw("a", "{}")
            .with_status("b", 500);

        assert_eq!(source.file_metadata(&id("a")).await.unwrap(), "{}");
        assert!(matches!(
            source.file_metadata(&id("b")).await,
            Err(ApiError::Status { status: 500, .. })
        ));
        assert!(matches!(
            source.file_metadata(&id("c")).await,
            Err(ApiError::Status { status: 404, .. })
        ));
        assert_eq!(source.fetches(), 3);
    }
}
