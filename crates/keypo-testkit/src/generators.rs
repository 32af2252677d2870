//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Value};

use keypo_core::{ChainName, DataIdentifier, EvmAddress, LocalWallet};

/// Generate a wallet from a random valid secret.
pub fn wallet() -> impl Strategy<Value = LocalWallet> {
    any::<[u8; 32]>().prop_filter_map("secret outside the curve order", |secret| {
        LocalWallet::from_bytes(&secret).ok()
    })
}

/// Generate a random address.
pub fn evm_address() -> impl Strategy<Value = EvmAddress> {
    any::<[u8; 20]>().prop_map(EvmAddress::from_bytes)
}

/// Generate a data identifier.
pub fn data_identifier() -> impl Strategy<Value = DataIdentifier> {
    "[A-Za-z0-9_-]{1,64}".prop_filter_map("identifier must be non-empty", |s| {
        DataIdentifier::new(s).ok()
    })
}

/// Generate a ciphertext hash in the form the SDK produces.
pub fn data_to_encrypt_hash() -> impl Strategy<Value = String> {
    any::<[u8; 32]>().prop_map(hex::encode)
}

/// Generate a chain name.
pub fn chain_name() -> impl Strategy<Value = ChainName> {
    prop_oneof![
        Just(ChainName::default()),
        Just(ChainName::new("ethereum").expect("non-empty")),
        Just(ChainName::new("base").expect("non-empty")),
    ]
}

/// Parameters for generating record metadata.
#[derive(Debug, Clone)]
pub struct MetadataParams {
    pub data_to_encrypt_hash: String,
    /// Proxy address; `Some` makes the record proxied.
    pub proxy_address: Option<String>,
    /// Unrelated field the authorizer must carry through.
    pub name: String,
}

impl MetadataParams {
    /// The metadata document.
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "name": self.name,
            "encryptedData": { "dataToEncryptHash": self.data_to_encrypt_hash },
        });
        if let Some(proxy) = &self.proxy_address {
            value["proxyMetadata"] = json!({ "proxyAddress": proxy });
        }
        value
    }
}

impl Arbitrary for MetadataParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            data_to_encrypt_hash(),
            proptest::option::of(evm_address().prop_map(|a| a.to_checksum())),
            "[a-z]{1,12}\\.txt",
        )
            .prop_map(|(hash, proxy, name)| MetadataParams {
                data_to_encrypt_hash: hash,
                proxy_address: proxy,
                name,
            })
            .boxed()
    }
}
