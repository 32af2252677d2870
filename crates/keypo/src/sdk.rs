//! The encryption SDK seam.
//!
//! Encryption, sharing and deletion are delegated to an external SDK that
//! owns the ciphertext store and the on-chain registry writes. Its failures
//! are opaque to us and pass through as [`anyhow::Error`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use keypo_core::{
    keccak256, CoreError, DataIdentifier, EvmAddress, RecoverableSignature, Signer, SignerError,
};

/// Smart-account implementation the wallet delegates to (Kernel v3.3).
pub const KERNEL_V3_3_IMPLEMENTATION: &str = "0xd6CEDDe84be40893d153Be9d467CD6aD37875b28";

/// EIP-7702 authorization magic byte.
const DELEGATION_MAGIC: u8 = 0x05;

/// An EIP-7702 authorization: the wallet lets its account run the code of
/// `contract_address` on `chain_id`, valid while the account nonce is
/// `nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationAuthorization {
    pub contract_address: EvmAddress,
    pub chain_id: u64,
    pub nonce: u64,
    /// 0x-prefixed 32-byte `r`.
    pub r: String,
    /// 0x-prefixed 32-byte `s`.
    pub s: String,
    pub y_parity: u8,
}

impl DelegationAuthorization {
    /// `keccak256(0x05 || rlp([chain_id, address, nonce]))`.
    pub fn signing_hash(contract_address: &EvmAddress, chain_id: u64, nonce: u64) -> [u8; 32] {
        let mut fields = Vec::with_capacity(9 + 21 + 9);
        rlp_uint(&mut fields, chain_id);
        rlp_bytes(&mut fields, contract_address.as_bytes());
        rlp_uint(&mut fields, nonce);

        let mut out = Vec::with_capacity(2 + fields.len());
        out.push(DELEGATION_MAGIC);
        rlp_list_header(&mut out, fields.len());
        out.extend_from_slice(&fields);
        keccak256(&out)
    }

    /// Have `signer` authorize `contract_address` on `chain_id` at account
    /// nonce `nonce`.
    pub async fn sign<S: Signer + ?Sized>(
        signer: &S,
        contract_address: EvmAddress,
        chain_id: u64,
        nonce: u64,
    ) -> Result<Self, SignerError> {
        let digest = Self::signing_hash(&contract_address, chain_id, nonce);
        let signature = signer.sign_hash(&digest).await?;
        Ok(Self {
            contract_address,
            chain_id,
            nonce,
            r: format!("0x{}", hex::encode(signature.r())),
            s: format!("0x{}", hex::encode(signature.s())),
            y_parity: signature.y_parity(),
        })
    }

    /// Recover the authorizing wallet.
    pub fn signer(&self) -> Result<EvmAddress, CoreError> {
        if self.y_parity > 1 {
            return Err(CoreError::InvalidSignature(format!(
                "yParity must be 0 or 1, got {}",
                self.y_parity
            )));
        }
        let signature =
            RecoverableSignature::from_rsv(&word(&self.r)?, &word(&self.s)?, self.y_parity);
        signature.recover_prehash(&Self::signing_hash(
            &self.contract_address,
            self.chain_id,
            self.nonce,
        ))
    }
}

fn word(hex_str: &str) -> Result<[u8; 32], CoreError> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(stripped).map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CoreError::InvalidSignature(format!("expected 32 bytes, got {}", bytes.len())))
}

/// RLP string header plus payload.
fn rlp_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    match bytes {
        [b] if *b < 0x80 => out.push(*b),
        _ => {
            // Payloads here are at most 20 bytes, below the long-form threshold.
            debug_assert!(bytes.len() < 56);
            out.push(0x80 + bytes.len() as u8);
            out.extend_from_slice(bytes);
        }
    }
}

/// RLP integer: big-endian with no leading zeros; zero is the empty string.
fn rlp_uint(out: &mut Vec<u8>, value: u64) {
    let be = value.to_be_bytes();
    let skip = be.iter().take_while(|b| **b == 0).count();
    rlp_bytes(out, &be[skip..]);
}

fn rlp_list_header(out: &mut Vec<u8>, payload_len: usize) {
    debug_assert!(payload_len < 56);
    out.push(0xc0 + payload_len as u8);
}

/// Parameters for storing a new record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptRequest {
    /// Display name of the record.
    pub name: String,
    /// Extra metadata stored alongside the ciphertext.
    pub metadata: Value,
    pub authorization: DelegationAuthorization,
    pub bundler_rpc_url: String,
    pub validator_contract_address: String,
    pub debug: bool,
}

/// Outcome of storing a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptResult {
    pub data_identifier: DataIdentifier,
    pub data_to_encrypt_hash: String,
}

/// External encryption SDK.
#[async_trait]
pub trait EncryptionSdk: Send + Sync {
    /// Current transaction nonce of `account`, bound into its delegation.
    async fn account_nonce(&self, account: &EvmAddress) -> anyhow::Result<u64>;

    /// Encrypt and store `data`, registering `signer` as its owner.
    async fn encrypt(
        &self,
        data: &[u8],
        signer: &dyn Signer,
        request: &EncryptRequest,
    ) -> anyhow::Result<EncryptResult>;

    /// Decrypt a record the signer may read.
    async fn decrypt(&self, identifier: &DataIdentifier, signer: &dyn Signer) -> anyhow::Result<Vec<u8>>;

    /// Grant `recipient` read access.
    async fn share(
        &self,
        identifier: &DataIdentifier,
        signer: &dyn Signer,
        recipient: &EvmAddress,
    ) -> anyhow::Result<()>;

    /// Delete a record the signer owns.
    async fn delete(&self, identifier: &DataIdentifier, signer: &dyn Signer) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use keypo_core::LocalWallet;

    #[tokio::test]
    async fn test_delegation_recovers_signer() {
        let wallet = LocalWallet::random();
        let contract = EvmAddress::from_hex(KERNEL_V3_3_IMPLEMENTATION).unwrap();

        let auth = DelegationAuthorization::sign(&wallet, contract, 84532, 7).await.unwrap();
        assert_eq!(auth.signer().unwrap(), wallet.evm_address());
        assert!(auth.y_parity <= 1);

        let mut moved = auth.clone();
        moved.chain_id = 1;
        assert_ne!(moved.signer().unwrap(), wallet.evm_address());

        let mut replayed = auth.clone();
        replayed.nonce = 8;
        assert_ne!(replayed.signer().unwrap(), wallet.evm_address());
    }

    #[test]
    fn test_signing_hash_encoding() {
        // 0x05 || rlp([1, 0x00..00, 0])
        let mut expected = vec![0x05, 0xd7, 0x01, 0x94];
        expected.extend_from_slice(&[0u8; 20]);
        expected.push(0x80);
        assert_eq!(
            DelegationAuthorization::signing_hash(&EvmAddress::ZERO, 1, 0),
            keccak256(&expected)
        );
    }

    #[test]
    fn test_rlp_integers() {
        let encode = |v: u64| {
            let mut out = Vec::new();
            rlp_uint(&mut out, v);
            out
        };
        assert_eq!(encode(0), vec![0x80]);
        assert_eq!(encode(0x7f), vec![0x7f]);
        assert_eq!(encode(0x80), vec![0x81, 0x80]);
        assert_eq!(encode(84532), vec![0x83, 0x01, 0x4a, 0xf4]);
    }

    #[test]
    fn test_wire_fields() {
        let auth = DelegationAuthorization {
            contract_address: EvmAddress::ZERO,
            chain_id: 1,
            nonce: 0,
            r: format!("0x{}", "11".repeat(32)),
            s: format!("0x{}", "22".repeat(32)),
            y_parity: 1,
        };
        let value = serde_json::to_value(&auth).unwrap();
        assert_eq!(value["chainId"], 1);
        assert_eq!(value["yParity"], 1);
        assert!(value.get("contractAddress").is_some());
    }
}
