//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use keypo::KeypoConfig;
use keypo_core::{DataIdentifier, LocalWallet};
use keypo_session::{AccessControlNetwork, AuthorizeRequest, MemoryNetwork, MemoryNetworkConfig};

/// Permission registry used throughout the fixtures.
pub const REGISTRY_ADDRESS: &str = "0x8a791620dd6260079bf849dc5567adc3f2fdc318";

/// Permission validator used throughout the fixtures.
pub const VALIDATOR_ADDRESS: &str = "0x610178da211fef7d417bc0e6fed39f05609ad788";

/// The record most tests decrypt.
pub const DOC_ID: &str = "doc-123";

/// A wallet derived deterministically from `index`.
pub fn wallet_from_seed(index: u8) -> LocalWallet {
    let mut secret = [0u8; 32];
    secret[30] = 1;
    secret[31] = index;
    LocalWallet::from_bytes(&secret).expect("small scalars are valid keys")
}

/// Create distinct deterministic wallets for multi-party tests.
pub fn multi_party_wallets(count: usize) -> Vec<LocalWallet> {
    (0..count).map(|i| wallet_from_seed(i as u8)).collect()
}

/// Metadata of a record gated by the permission registry.
pub fn contract_metadata(data_to_encrypt_hash: &str) -> Value {
    json!({
        "name": "notes.txt",
        "encryptedData": { "dataToEncryptHash": data_to_encrypt_hash },
    })
}

/// Metadata of a record served through a proxy action.
pub fn proxy_metadata(data_to_encrypt_hash: &str, proxy_address: &str) -> Value {
    json!({
        "name": "notes.txt",
        "encryptedData": { "dataToEncryptHash": data_to_encrypt_hash },
        "proxyMetadata": { "proxyAddress": proxy_address },
    })
}

/// The metadata API's response body for `metadata`.
pub fn metadata_envelope(metadata: &Value) -> String {
    json!({ "fileMetadata": { "fileMetadata": metadata.to_string() } }).to_string()
}

/// A complete configuration pointing at `api_url`.
pub fn test_config(api_url: &str) -> KeypoConfig {
    KeypoConfig::from_lookup(|name| {
        let value = match name {
            keypo::config::ENV_DATA_IDENTIFIER => DOC_ID,
            keypo::config::ENV_API_URL => api_url,
            keypo::config::ENV_REGISTRY_CONTRACT_ADDRESS => REGISTRY_ADDRESS,
            keypo::config::ENV_BUNDLER_RPC_URL => "http://bundler.invalid",
            keypo::config::ENV_VALIDATOR_CONTRACT_ADDRESS => VALIDATOR_ADDRESS,
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("fixture configuration is complete")
}

/// A wallet plus a connected in-memory network.
pub struct TestFixture {
    pub wallet: LocalWallet,
    pub network: MemoryNetwork,
}

impl TestFixture {
    /// A fixture with a random wallet and a connected default network.
    pub async fn new() -> Self {
        Self::with_network(MemoryNetworkConfig::default()).await
    }

    /// A fixture whose network uses `config`.
    pub async fn with_network(config: MemoryNetworkConfig) -> Self {
        let network = MemoryNetwork::new(config);
        network.connect().await.expect("memory network connects");
        Self {
            wallet: LocalWallet::random(),
            network,
        }
    }

    /// An authorization request for `identifier` against the fixture registry.
    pub fn request(&self, identifier: &str) -> AuthorizeRequest {
        AuthorizeRequest::new(
            DataIdentifier::new(identifier).expect("fixture identifiers are non-empty"),
            REGISTRY_ADDRESS,
            Utc::now() + Duration::minutes(10),
        )
    }
}
