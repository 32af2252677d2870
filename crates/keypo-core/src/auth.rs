//! Wallet signatures and session credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, SignerError};
use crate::siwe::{parse_timestamp, SiweMessage};
use crate::types::EvmAddress;
use crate::wallet::Signer;

/// How an [`AuthSig`] was produced.
pub const PERSONAL_SIGN: &str = "web3.eth.personal.sign";

/// A wallet signature over a SIWE message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSig {
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    pub address: String,
}

impl AuthSig {
    /// Have `signer` sign `message`.
    ///
    /// The recorded address is the one bound into the message.
    pub async fn sign<S: Signer + ?Sized>(
        signer: &S,
        message: &SiweMessage,
    ) -> Result<Self, SignerError> {
        let text = message.to_message();
        let signature = signer.sign_message(text.as_bytes()).await?;
        Ok(Self {
            sig: signature.to_hex(),
            derived_via: PERSONAL_SIGN.to_string(),
            signed_message: text,
            address: message.address.to_checksum(),
        })
    }

    /// Recover the signer and check it matches `address`.
    pub fn verify(&self) -> Result<EvmAddress, CoreError> {
        let claimed = EvmAddress::from_hex(&self.address)?;
        let signature = crate::crypto::RecoverableSignature::from_hex(&self.sig)?;
        let recovered = signature.recover_personal(self.signed_message.as_bytes())?;
        if recovered != claimed {
            return Err(CoreError::AddressMismatch {
                expected: claimed.to_checksum(),
                recovered: recovered.to_checksum(),
            });
        }
        Ok(recovered)
    }
}

/// One node's signature over a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSig {
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
}

impl SessionSig {
    /// The `expiration` field of the signed session payload.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        let payload: serde_json::Value = serde_json::from_str(&self.signed_message).ok()?;
        parse_timestamp(payload.get("expiration")?.as_str()?).ok()
    }
}

/// Session credential: one signature per network node, keyed by node URL.
///
/// Opaque apart from its expiration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSigs(BTreeMap<String, SessionSig>);

impl SessionSigs {
    /// Build from per-node signatures.
    pub fn new(sigs: BTreeMap<String, SessionSig>) -> Self {
        Self(sigs)
    }

    /// Earliest expiration across nodes.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.0.values().filter_map(SessionSig::expiration).min()
    }

    /// Whether the credential is still valid at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration().is_some_and(|exp| exp > now)
    }

    /// Node URLs that signed.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Signature for a node.
    pub fn get(&self, node: &str) -> Option<&SessionSig> {
        self.0.get(node)
    }

    /// Number of node signatures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no signatures.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
