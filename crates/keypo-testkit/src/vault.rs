//! In-memory encryption SDK.
//!
//! Encrypts with ChaCha20-Poly1305 under a fresh key per record and keeps
//! an owner plus reader list for access checks. Each stored record consumes
//! one account nonce, so a delegation can only be used once. Good enough to
//! exercise the facade end to end without the real SDK.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde_json::{json, Value};

use keypo::{EncryptRequest, EncryptResult, EncryptionSdk};
use keypo_core::{DataIdentifier, EvmAddress, Sha256Hash, Signer};

struct Record {
    owner: EvmAddress,
    readers: BTreeSet<EvmAddress>,
    key: [u8; 32],
    nonce: [u8; 12],
    ciphertext: Vec<u8>,
    metadata: Value,
}

/// In-memory [`EncryptionSdk`].
#[derive(Default)]
pub struct MemoryVault {
    records: Mutex<HashMap<DataIdentifier, Record>>,
    nonces: Mutex<HashMap<EvmAddress, u64>>,
    counter: AtomicU64,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata the backend would serve for `identifier`.
    pub fn metadata(&self, identifier: &DataIdentifier) -> Option<Value> {
        self.records
            .lock()
            .unwrap()
            .get(identifier)
            .map(|r| r.metadata.clone())
    }

    /// Stored ciphertext for `identifier`.
    pub fn ciphertext(&self, identifier: &DataIdentifier) -> Option<Vec<u8>> {
        self.records
            .lock()
            .unwrap()
            .get(identifier)
            .map(|r| r.ciphertext.clone())
    }

    pub fn contains(&self, identifier: &DataIdentifier) -> bool {
        self.records.lock().unwrap().contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EncryptionSdk for MemoryVault {
    async fn account_nonce(&self, account: &EvmAddress) -> anyhow::Result<u64> {
        Ok(self.nonces.lock().unwrap().get(account).copied().unwrap_or(0))
    }

    async fn encrypt(
        &self,
        data: &[u8],
        signer: &dyn Signer,
        request: &EncryptRequest,
    ) -> anyhow::Result<EncryptResult> {
        let owner = signer.address().await?;
        let delegated_by = request
            .authorization
            .signer()
            .context("delegation signature does not recover")?;
        if delegated_by != owner {
            bail!("delegation signed by {delegated_by}, not {owner}");
        }
        {
            let mut nonces = self.nonces.lock().unwrap();
            let current = nonces.entry(owner).or_insert(0);
            if request.authorization.nonce != *current {
                bail!(
                    "delegation nonce {} does not match account nonce {current}",
                    request.authorization.nonce
                );
            }
            *current += 1;
        }

        let mut rng = rand::thread_rng();
        let mut key = [0u8; 32];
        let mut nonce = [0u8; 12];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|e| anyhow!("{e}"))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), data)
            .map_err(|e| anyhow!("encryption failed: {e}"))?;

        let data_to_encrypt_hash = Sha256Hash::hash(data).to_hex();
        let serial = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut id_input = owner.as_bytes().to_vec();
        id_input.extend_from_slice(data_to_encrypt_hash.as_bytes());
        id_input.extend_from_slice(&serial.to_be_bytes());
        let data_identifier =
            DataIdentifier::new(format!("0x{}", Sha256Hash::hash(&id_input).to_hex()))?;

        let metadata = json!({
            "name": request.name,
            "encryptedData": { "dataToEncryptHash": data_to_encrypt_hash },
            "userMetaData": request.metadata,
        });

        self.records.lock().unwrap().insert(
            data_identifier.clone(),
            Record {
                owner,
                readers: BTreeSet::new(),
                key,
                nonce,
                ciphertext,
                metadata,
            },
        );

        Ok(EncryptResult {
            data_identifier,
            data_to_encrypt_hash,
        })
    }

    async fn decrypt(&self, identifier: &DataIdentifier, signer: &dyn Signer) -> anyhow::Result<Vec<u8>> {
        let caller = signer.address().await?;
        let records = self.records.lock().unwrap();
        let record = records
            .get(identifier)
            .ok_or_else(|| anyhow!("no record {identifier}"))?;
        if record.owner != caller && !record.readers.contains(&caller) {
            bail!("{caller} may not read {identifier}");
        }

        let cipher = ChaCha20Poly1305::new_from_slice(&record.key).map_err(|e| anyhow!("{e}"))?;
        cipher
            .decrypt(Nonce::from_slice(&record.nonce), record.ciphertext.as_slice())
            .map_err(|e| anyhow!("decryption failed: {e}"))
    }

    async fn share(
        &self,
        identifier: &DataIdentifier,
        signer: &dyn Signer,
        recipient: &EvmAddress,
    ) -> anyhow::Result<()> {
        let caller = signer.address().await?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(identifier)
            .ok_or_else(|| anyhow!("no record {identifier}"))?;
        if record.owner != caller {
            bail!("only the owner may share {identifier}");
        }
        record.readers.insert(*recipient);
        Ok(())
    }

    async fn delete(&self, identifier: &DataIdentifier, signer: &dyn Signer) -> anyhow::Result<()> {
        let caller = signer.address().await?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get(identifier)
            .ok_or_else(|| anyhow!("no record {identifier}"))?;
        if record.owner != caller {
            bail!("only the owner may delete {identifier}");
        }
        records.remove(identifier);
        Ok(())
    }
}
