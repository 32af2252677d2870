//! Signer capability and a local secp256k1 wallet.
//!
//! The authorizer needs two things from a wallet: its address and a
//! `personal_sign` over an arbitrary message. Delegation authorizations
//! additionally need a raw signature over a precomputed digest. Embedded
//! wallets from a login provider, hardware wallets, or [`LocalWallet`] all
//! fit behind [`Signer`].

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use std::fmt;
use std::sync::Arc;

use crate::crypto::{address_of, eip191_hash, RecoverableSignature};
use crate::error::{CoreError, SignerError};
use crate::types::EvmAddress;

/// Anything that can report an address and sign a message.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Signer: Send + Sync {
    /// The account address of this signer.
    async fn address(&self) -> Result<EvmAddress, SignerError>;

    /// Sign `message` with EIP-191 `personal_sign` semantics.
    async fn sign_message(&self, message: &[u8]) -> Result<RecoverableSignature, SignerError>;

    /// Sign a 32-byte digest as is, without any message prefix.
    async fn sign_hash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, SignerError>;
}

#[async_trait]
impl<S: Signer + ?Sized> Signer for Arc<S> {
    async fn address(&self) -> Result<EvmAddress, SignerError> {
        (**self).address().await
    }

    async fn sign_message(&self, message: &[u8]) -> Result<RecoverableSignature, SignerError> {
        (**self).sign_message(message).await
    }

    async fn sign_hash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, SignerError> {
        (**self).sign_hash(digest).await
    }
}

/// A wallet holding a secp256k1 private key in memory.
#[derive(Clone)]
pub struct LocalWallet {
    signing_key: SigningKey,
    address: EvmAddress,
}

impl LocalWallet {
    /// Generate a new random wallet.
    pub fn random() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self::from_signing_key(signing_key)
    }

    /// Create from a 32-byte private key.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, CoreError> {
        let signing_key =
            SigningKey::from_slice(secret).map_err(|_| CoreError::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Create from a hex private key, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| CoreError::InvalidPrivateKey)?;
        let secret: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidPrivateKey)?;
        Self::from_bytes(&secret)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// The wallet's address (available synchronously for local keys).
    pub fn evm_address(&self) -> EvmAddress {
        self.address
    }

    /// Sign synchronously.
    pub fn sign_sync(&self, message: &[u8]) -> Result<RecoverableSignature, SignerError> {
        self.sign_hash_sync(&eip191_hash(message))
    }

    /// Sign a digest synchronously.
    pub fn sign_hash_sync(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, SignerError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| SignerError::Key(e.to_string()))?;
        Ok(RecoverableSignature::from_parts(&signature, recovery_id))
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalWallet({})", self.address)
    }
}

#[async_trait]
impl Signer for LocalWallet {
    async fn address(&self) -> Result<EvmAddress, SignerError> {
        Ok(self.address)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<RecoverableSignature, SignerError> {
        self.sign_sync(message)
    }

    async fn sign_hash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, SignerError> {
        self.sign_hash_sync(digest)
    }
}
