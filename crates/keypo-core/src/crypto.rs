//! Cryptographic primitives: Keccak-256, SHA-256, and recoverable secp256k1
//! signatures in the Ethereum `personal_sign` format.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::EvmAddress;

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// EIP-191 `personal_sign` digest:
/// `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Derive the EVM address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> EvmAddress {
    let point = k256::PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    EvmAddress(bytes)
}

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHA256({}...)", &self.to_hex()[..8])
    }
}

/// A 65-byte recoverable signature: `r || s || v`, with `v` in `{27, 28}`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; 65]);

impl RecoverableSignature {
    /// Assemble from a k256 signature and recovery id.
    pub fn from_parts(signature: &Signature, recovery_id: RecoveryId) -> Self {
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte() + 27;
        Self(bytes)
    }

    /// Parse from `0x`-prefixed (or bare) hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(stripped).map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
        let arr: [u8; 65] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidSignature(format!("expected 65 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    /// `0x`-prefixed lowercase hex, as wallets return it.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// `r` component.
    pub fn r(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.0[..32]);
        r
    }

    /// `s` component.
    pub fn s(&self) -> [u8; 32] {
        let mut s = [0u8; 32];
        s.copy_from_slice(&self.0[32..64]);
        s
    }

    /// Recovery id as 0 or 1, the `yParity` of typed transactions.
    pub fn y_parity(&self) -> u8 {
        let v = self.0[64];
        if v >= 27 {
            v - 27
        } else {
            v
        }
    }

    /// Reassemble from `r`, `s` and `yParity`.
    pub fn from_rsv(r: &[u8; 32], s: &[u8; 32], y_parity: u8) -> Self {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(r);
        bytes[32..64].copy_from_slice(s);
        bytes[64] = y_parity + 27;
        Self(bytes)
    }

    /// Recover the address that produced this signature over `message`
    /// under `personal_sign` hashing.
    pub fn recover_personal(&self, message: &[u8]) -> Result<EvmAddress> {
        self.recover_prehash(&eip191_hash(message))
    }

    /// Recover the address that signed `digest` directly.
    pub fn recover_prehash(&self, digest: &[u8; 32]) -> Result<EvmAddress> {
        let signature = Signature::from_slice(&self.0[..64])
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
        let v = self.y_parity();
        let recovery_id = RecoveryId::from_byte(v)
            .ok_or_else(|| CoreError::InvalidSignature(format!("bad recovery byte {}", self.0[64])))?;

        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
        Ok(address_of(&key))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}...)", &self.to_hex()[..18])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_sha256_known() {
        assert_eq!(
            Sha256Hash::hash(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_eip191_differs_from_raw_keccak() {
        assert_ne!(eip191_hash(b"hello"), keccak256(b"hello"));
    }

    #[test]
    fn test_rsv_round_trip() {
        let mut bytes = [0x11u8; 65];
        bytes[64] = 28;
        let sig = RecoverableSignature(bytes);
        assert_eq!(sig.y_parity(), 1);
        assert_eq!(RecoverableSignature::from_rsv(&sig.r(), &sig.s(), sig.y_parity()), sig);
    }

    #[test]
    fn test_signature_hex_length_checked() {
        assert!(RecoverableSignature::from_hex("0x1234").is_err());
        let ok = RecoverableSignature::from_hex(&format!("0x{}", "11".repeat(65)));
        assert!(ok.is_ok());
    }
}
