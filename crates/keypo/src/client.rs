//! The Keypo facade: unified API over authorization, the backend API, and
//! the encryption SDK.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;

use keypo_api::{DecryptionApi, DecryptionRequest, MetadataSource};
use keypo_core::{DataIdentifier, EvmAddress, Signer};
use keypo_session::{
    AccessControlNetwork, Authorization, AuthorizeRequest, AuthorizerConfig, SessionAuthorizer,
};

use crate::config::KeypoConfig;
use crate::error::{KeypoError, Result};
use crate::handle::NetworkHandle;
use crate::sdk::{
    DelegationAuthorization, EncryptRequest, EncryptResult, EncryptionSdk,
    KERNEL_V3_3_IMPLEMENTATION,
};
use crate::status::{Attempt, DecryptStatus, StatusMachine};

/// Result of a decryption through the backend API.
#[derive(Debug, Clone)]
pub struct Decrypted {
    /// The backend's response.
    pub result: Value,
    /// The authorization the request was made with.
    pub authorization: Authorization,
}

/// The main Keypo struct.
///
/// Provides a unified API for:
/// - Encrypting and storing records
/// - Decrypting records through a session credential
/// - Sharing and deleting records
/// - Observing decrypt progress
pub struct Keypo<N: AccessControlNetwork, M, E> {
    network: NetworkHandle<N>,
    api: M,
    sdk: E,
    config: KeypoConfig,
    authorizer: AuthorizerConfig,
    status: StatusMachine,
}

impl<N, M, E> Keypo<N, M, E>
where
    N: AccessControlNetwork,
    M: MetadataSource + DecryptionApi,
    E: EncryptionSdk,
{
    /// Create a facade over a connected network.
    pub fn new(network: NetworkHandle<N>, api: M, sdk: E, config: KeypoConfig) -> Self {
        Self {
            network,
            api,
            sdk,
            config,
            authorizer: AuthorizerConfig::default(),
            status: StatusMachine::new(),
        }
    }

    /// Override the authorizer configuration.
    pub fn with_authorizer_config(mut self, authorizer: AuthorizerConfig) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn config(&self) -> &KeypoConfig {
        &self.config
    }

    pub fn network(&self) -> &N {
        self.network.network()
    }

    /// The backend API client.
    pub fn api(&self) -> &M {
        &self.api
    }

    pub fn sdk(&self) -> &E {
        &self.sdk
    }

    /// Current decrypt status.
    pub fn status(&self) -> DecryptStatus {
        self.status.current()
    }

    /// Watch decrypt status changes.
    pub fn subscribe(&self) -> watch::Receiver<DecryptStatus> {
        self.status.subscribe()
    }

    /// Disconnect from the network and return it.
    pub async fn release(self) -> Result<N> {
        Ok(self.network.release().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt and store `data` owned by `signer`.
    pub async fn encrypt<S: Signer>(
        &self,
        signer: &S,
        data: &[u8],
        name: &str,
        metadata: Value,
    ) -> Result<EncryptResult> {
        let contract = EvmAddress::from_hex(KERNEL_V3_3_IMPLEMENTATION)?;
        let owner = signer.address().await?;
        let nonce = self
            .sdk
            .account_nonce(&owner)
            .await
            .map_err(KeypoError::Sdk)?;
        let authorization =
            DelegationAuthorization::sign(signer, contract, self.config.chain_id, nonce).await?;

        let request = EncryptRequest {
            name: name.to_string(),
            metadata,
            authorization,
            bundler_rpc_url: self.config.bundler_rpc_url.clone(),
            validator_contract_address: self.config.validator_contract_address.clone(),
            debug: self.config.debug,
        };
        let result = self
            .sdk
            .encrypt(data, signer, &request)
            .await
            .map_err(KeypoError::Sdk)?;

        tracing::info!(identifier = %result.data_identifier, "record encrypted");
        Ok(result)
    }

    /// Decrypt through the backend API.
    ///
    /// Authorizes a session for `identifier`, then posts it with the
    /// record's metadata to the decryption endpoint. Drives the decrypt
    /// status; fails with [`StatusError::Busy`](crate::StatusError::Busy)
    /// if another decrypt is in flight.
    pub async fn decrypt<S: Signer + ?Sized>(
        &self,
        signer: &S,
        identifier: &DataIdentifier,
    ) -> Result<Decrypted> {
        let attempt = self.status.attempt()?;
        let outcome = self.run_decrypt(signer, identifier).await;
        finish(attempt, outcome)
    }

    /// Decrypt the configured record.
    pub async fn decrypt_default<S: Signer + ?Sized>(&self, signer: &S) -> Result<Decrypted> {
        let identifier = self.config.data_identifier.clone();
        self.decrypt(signer, &identifier).await
    }

    /// Decrypt through the encryption SDK.
    pub async fn decrypt_with_sdk<S: Signer>(
        &self,
        signer: &S,
        identifier: &DataIdentifier,
    ) -> Result<Vec<u8>> {
        let attempt = self.status.attempt()?;
        let outcome: Result<Vec<u8>> = async {
            self.status.advance(DecryptStatus::Decrypting)?;
            self.sdk
                .decrypt(identifier, signer)
                .await
                .map_err(KeypoError::Sdk)
        }
        .await;
        finish(attempt, outcome)
    }

    /// Grant `recipient` access to a record.
    pub async fn share<S: Signer>(
        &self,
        signer: &S,
        identifier: &DataIdentifier,
        recipient: &EvmAddress,
    ) -> Result<()> {
        self.sdk
            .share(identifier, signer, recipient)
            .await
            .map_err(KeypoError::Sdk)?;
        tracing::info!(%identifier, %recipient, "record shared");
        Ok(())
    }

    /// Delete a record.
    pub async fn delete<S: Signer>(&self, signer: &S, identifier: &DataIdentifier) -> Result<()> {
        self.sdk
            .delete(identifier, signer)
            .await
            .map_err(KeypoError::Sdk)?;
        tracing::info!(%identifier, "record deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    async fn run_decrypt<S: Signer + ?Sized>(
        &self,
        signer: &S,
        identifier: &DataIdentifier,
    ) -> Result<Decrypted> {
        let request = AuthorizeRequest {
            chain: self.config.chain.clone(),
            expiration: Utc::now() + self.config.session_ttl,
            registry_address: self.config.registry_contract_address.clone(),
            data_identifier: identifier.clone(),
            auth_sig_expiration: None,
        };

        self.status.advance(DecryptStatus::AwaitingSession)?;
        let authorizer =
            SessionAuthorizer::new(self.network.network(), &self.api, self.authorizer.clone());
        let authorization = authorizer.authorize(signer, &request).await?;

        self.status.advance(DecryptStatus::Decrypting)?;
        let result = self
            .api
            .decrypt(&DecryptionRequest {
                data_identifier: identifier,
                session_sigs: &authorization.session_sigs,
                data_metadata: &authorization.metadata,
            })
            .await?;

        Ok(Decrypted {
            result,
            authorization,
        })
    }
}

/// Record how an attempt ended.
fn finish<T>(attempt: Attempt<'_>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            attempt.complete()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(status_err) = attempt.fail(e.to_string()) {
                tracing::warn!(error = %status_err, "could not record decrypt failure");
            }
            Err(e)
        }
    }
}
