//! Access-control network abstraction.
//!
//! The network issues session credentials. When it needs fresh proof of
//! wallet ownership it calls back into the application through an
//! [`AuthNeededCallback`]. Implementations may wrap a remote node cluster
//! or, for tests, the in-process [`memory::MemoryNetwork`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keypo_core::{AuthSig, ChainName, ResourceAbilityRequest, SessionSigs};

use crate::error::{CallbackError, NetworkError};

/// Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Parameters the network passes to the auth callback.
///
/// Every field is optional on the wire; the callback decides which are required.
#[derive(Debug, Clone, Default)]
pub struct AuthCallbackParams {
    /// Session URI the proof must be bound to.
    pub uri: Option<String>,
    /// ISO-8601 expiration for the proof.
    pub expiration: Option<String>,
    /// Resources and abilities the proof must cover.
    pub resource_ability_requests: Option<Vec<ResourceAbilityRequest>>,
}

/// Produces a wallet proof on demand.
#[async_trait]
pub trait AuthNeededCallback: Send + Sync {
    /// Sign a login message satisfying `params`.
    async fn call(&self, params: AuthCallbackParams) -> std::result::Result<AuthSig, CallbackError>;
}

/// A request for session credentials.
#[derive(Debug, Clone)]
pub struct SessionSigsRequest {
    pub chain: ChainName,
    pub expiration: DateTime<Utc>,
    pub resource_ability_requests: Vec<ResourceAbilityRequest>,
    /// Delegated capacity to pay for the request, if any.
    pub capacity_delegation_auth_sig: Option<AuthSig>,
}

/// Client for the access-control network.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait AccessControlNetwork: Send + Sync {
    /// Open a connection to the network.
    async fn connect(&self) -> Result<()>;

    /// Close the connection. Further calls fail with `NotConnected`.
    async fn disconnect(&self) -> Result<()>;

    /// Whether `connect()` has succeeded and `disconnect()` has not been called.
    fn is_connected(&self) -> bool;

    /// Latest block hash, used as a freshness nonce in login messages.
    async fn latest_blockhash(&self) -> Result<String>;

    /// Obtain session credentials, invoking `callback` if wallet proof is needed.
    async fn get_session_sigs(
        &self,
        request: SessionSigsRequest,
        callback: &dyn AuthNeededCallback,
    ) -> Result<SessionSigs>;
}

#[async_trait]
impl<N: AccessControlNetwork + ?Sized> AccessControlNetwork for Arc<N> {
    async fn connect(&self) -> Result<()> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        (**self).disconnect().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn latest_blockhash(&self) -> Result<String> {
        (**self).latest_blockhash().await
    }

    async fn get_session_sigs(
        &self,
        request: SessionSigsRequest,
        callback: &dyn AuthNeededCallback,
    ) -> Result<SessionSigs> {
        (**self).get_session_sigs(request, callback).await
    }
}

/// An in-process access-control network.
///
/// Verifies wallet proofs the way the real network does (signature
/// recovery, URI binding, ReCap coverage) and issues node-signed session
/// credentials. Records what it saw so tests can make assertions.
pub mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    use keypo_core::{
        format_timestamp, keccak256, LocalWallet, ParsedSiwe, SessionSig,
    };

    /// Configuration for [`MemoryNetwork`].
    #[derive(Debug, Clone)]
    pub struct MemoryNetworkConfig {
        /// URLs of the simulated nodes; one session signature per node.
        pub node_urls: Vec<String>,
        /// How many times the network asks for wallet proof per session
        /// request. Zero simulates a network that already holds valid proof.
        pub proof_rounds: usize,
    }

    impl Default for MemoryNetworkConfig {
        fn default() -> Self {
            Self {
                node_urls: vec![
                    "https://node-0.memory.invalid".to_string(),
                    "https://node-1.memory.invalid".to_string(),
                    "https://node-2.memory.invalid".to_string(),
                ],
                proof_rounds: 1,
            }
        }
    }

    #[derive(Default)]
    struct NetworkLog {
        callback_invocations: usize,
        nonces_seen: Vec<String>,
        session_requests: Vec<SessionSigsRequest>,
    }

    /// In-memory network implementation.
    pub struct MemoryNetwork {
        config: MemoryNetworkConfig,
        connected: AtomicBool,
        block: AtomicU64,
        node_keys: Vec<LocalWallet>,
        log: Mutex<NetworkLog>,
    }

    impl MemoryNetwork {
        /// Create a disconnected network.
        pub fn new(config: MemoryNetworkConfig) -> Self {
            let node_keys = (0..config.node_urls.len())
                .map(|_| LocalWallet::random())
                .collect();
            Self {
                config,
                connected: AtomicBool::new(false),
                block: AtomicU64::new(0),
                node_keys,
                log: Mutex::new(NetworkLog::default()),
            }
        }

        /// Number of times the auth callback was invoked.
        pub fn callback_invocations(&self) -> usize {
            self.log.lock().unwrap().callback_invocations
        }

        /// Nonces found in wallet proofs, in order received.
        pub fn nonces_seen(&self) -> Vec<String> {
            self.log.lock().unwrap().nonces_seen.clone()
        }

        /// Session requests received, in order.
        pub fn session_requests(&self) -> Vec<SessionSigsRequest> {
            self.log.lock().unwrap().session_requests.clone()
        }

        /// Number of block hashes handed out so far.
        pub fn blockhash_requests(&self) -> u64 {
            self.block.load(Ordering::SeqCst)
        }

        fn ensure_connected(&self) -> Result<()> {
            if self.connected.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(NetworkError::NotConnected)
            }
        }

        /// Check a wallet proof against the session it was requested for.
        fn check_proof(
            &self,
            auth_sig: &AuthSig,
            session_uri: &str,
            request: &SessionSigsRequest,
        ) -> Result<ParsedSiwe> {
            auth_sig
                .verify()
                .map_err(|e| NetworkError::InvalidAuthSig(e.to_string()))?;

            let parsed = ParsedSiwe::parse(&auth_sig.signed_message)
                .map_err(|e| NetworkError::InvalidAuthSig(e.to_string()))?;
            if parsed.uri != session_uri {
                return Err(NetworkError::InvalidAuthSig(format!(
                    "proof bound to {}, expected {}",
                    parsed.uri, session_uri
                )));
            }
            if parsed.expiration_time.map_or(true, |exp| exp <= Utc::now()) {
                return Err(NetworkError::InvalidAuthSig("proof expired".into()));
            }

            let recap = parsed
                .recap()
                .map_err(|e| NetworkError::InvalidAuthSig(e.to_string()))?
                .ok_or_else(|| NetworkError::InvalidAuthSig("proof carries no recap".into()))?;
            for req in &request.resource_ability_requests {
                let (namespace, name) = req.ability.recap();
                if !recap.grants(&req.resource.uri(), &format!("{namespace}/{name}")) {
                    return Err(NetworkError::InvalidAuthSig(format!(
                        "proof does not grant {namespace}/{name} on {}",
                        req.resource.uri()
                    )));
                }
            }
            Ok(parsed)
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self::new(MemoryNetworkConfig::default())
        }
    }

    #[async_trait]
    impl AccessControlNetwork for MemoryNetwork {
        async fn connect(&self) -> Result<()> {
            if self.config.node_urls.is_empty() {
                return Err(NetworkError::Connection("no nodes configured".into()));
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn latest_blockhash(&self) -> Result<String> {
            self.ensure_connected()?;
            let height = self.block.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("0x{}", hex::encode(keccak256(&height.to_be_bytes()))))
        }

        async fn get_session_sigs(
            &self,
            request: SessionSigsRequest,
            callback: &dyn AuthNeededCallback,
        ) -> Result<SessionSigs> {
            self.ensure_connected()?;
            self.log.lock().unwrap().session_requests.push(request.clone());

            let now = Utc::now();
            if request.expiration <= now {
                return Err(NetworkError::Node("session expiration is in the past".into()));
            }
            if request.resource_ability_requests.is_empty() {
                return Err(NetworkError::Node("no resources requested".into()));
            }

            let session_key = hex::encode(rand::random::<[u8; 32]>());
            let session_uri = format!("lit:session:{session_key}");
            let expiration = format_timestamp(&request.expiration);

            let mut capabilities = Vec::new();
            for _ in 0..self.config.proof_rounds {
                let params = AuthCallbackParams {
                    uri: Some(session_uri.clone()),
                    expiration: Some(expiration.clone()),
                    resource_ability_requests: Some(request.resource_ability_requests.clone()),
                };
                self.log.lock().unwrap().callback_invocations += 1;
                let auth_sig = callback.call(params).await?;

                let parsed = self.check_proof(&auth_sig, &session_uri, &request)?;
                self.log.lock().unwrap().nonces_seen.push(parsed.nonce);
                capabilities.push(auth_sig);
            }
            if let Some(delegation) = &request.capacity_delegation_auth_sig {
                capabilities.push(delegation.clone());
            }

            let mut sigs = BTreeMap::new();
            for (url, key) in self.config.node_urls.iter().zip(&self.node_keys) {
                let payload = serde_json::json!({
                    "sessionKey": session_key,
                    "resourceAbilityRequests": request.resource_ability_requests,
                    "capabilities": capabilities,
                    "issuedAt": format_timestamp(&now),
                    "expiration": expiration,
                    "nodeAddress": url,
                })
                .to_string();
                let sig = key
                    .sign_sync(payload.as_bytes())
                    .map_err(|e| NetworkError::Node(e.to_string()))?;
                sigs.insert(
                    url.clone(),
                    SessionSig {
                        sig: sig.to_hex(),
                        derived_via: "litSessionSign".to_string(),
                        signed_message: payload,
                        address: key.evm_address().to_checksum(),
                        algo: Some("secp256k1".to_string()),
                    },
                );
            }

            tracing::debug!(
                nodes = sigs.len(),
                chain = %request.chain,
                "memory network issued session"
            );
            Ok(SessionSigs::new(sigs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{MemoryNetwork, MemoryNetworkConfig};
    use super::*;
    use keypo_core::{LocalWallet, SiweMessage};

    /// Signs exactly what it is asked for.
    struct HonestCallback {
        wallet: LocalWallet,
        nonce: String,
    }

    #[async_trait]
    impl AuthNeededCallback for HonestCallback {
        async fn call(&self, params: AuthCallbackParams) -> std::result::Result<AuthSig, CallbackError> {
            let expiration = keypo_core::parse_timestamp(&params.expiration.unwrap())?;
            let msg = SiweMessage::new(
                "localhost",
                self.wallet.evm_address(),
                params.uri.unwrap(),
                1,
                self.nonce.clone(),
                Utc::now(),
            )
            .expires_at(expiration)
            .with_recaps(&params.resource_ability_requests.unwrap())?;
            Ok(AuthSig::sign(&self.wallet, &msg).await?)
        }
    }

    /// Ignores the session URI the network asked for.
    struct WrongUriCallback(LocalWallet);

    #[async_trait]
    impl AuthNeededCallback for WrongUriCallback {
        async fn call(&self, params: AuthCallbackParams) -> std::result::Result<AuthSig, CallbackError> {
            let expiration = keypo_core::parse_timestamp(&params.expiration.unwrap())?;
            let msg = SiweMessage::new("localhost", self.0.evm_address(), "https://elsewhere", 1, "n", Utc::now())
                .expires_at(expiration)
                .with_recaps(&params.resource_ability_requests.unwrap())?;
            Ok(AuthSig::sign(&self.0, &msg).await?)
        }
    }

    fn request() -> SessionSigsRequest {
        SessionSigsRequest {
            chain: ChainName::default(),
            expiration: Utc::now() + chrono::Duration::minutes(10),
            resource_ability_requests: vec![ResourceAbilityRequest::execute_any_action()],
            capacity_delegation_auth_sig: None,
        }
    }

    #[tokio::test]
    async fn test_requires_connect() {
        let network = MemoryNetwork::default();
        assert!(matches!(
            network.latest_blockhash().await,
            Err(NetworkError::NotConnected)
        ));

        network.connect().await.unwrap();
        assert!(network.is_connected());
        network.latest_blockhash().await.unwrap();

        network.disconnect().await.unwrap();
        assert!(!network.is_connected());
    }

    #[tokio::test]
    async fn test_blockhash_advances() {
        let network = MemoryNetwork::default();
        network.connect().await.unwrap();
        let a = network.latest_blockhash().await.unwrap();
        let b = network.latest_blockhash().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(network.blockhash_requests(), 2);
    }

    #[tokio::test]
    async fn test_issues_one_sig_per_node() {
        let network = MemoryNetwork::default();
        network.connect().await.unwrap();
        let callback = HonestCallback {
            wallet: LocalWallet::random(),
            nonce: network.latest_blockhash().await.unwrap(),
        };

        let sigs = network.get_session_sigs(request(), &callback).await.unwrap();
        assert_eq!(sigs.len(), 3);
        assert!(sigs.is_valid_at(Utc::now()));
        assert_eq!(network.callback_invocations(), 1);
    }

    #[tokio::test]
    async fn test_zero_rounds_skips_callback() {
        let network = MemoryNetwork::new(MemoryNetworkConfig {
            proof_rounds: 0,
            ..Default::default()
        });
        network.connect().await.unwrap();
        let callback = HonestCallback {
            wallet: LocalWallet::random(),
            nonce: "0x0".into(),
        };

        network.get_session_sigs(request(), &callback).await.unwrap();
        assert_eq!(network.callback_invocations(), 0);
    }

    #[tokio::test]
    async fn test_rejects_proof_for_other_uri() {
        let network = MemoryNetwork::default();
        network.connect().await.unwrap();

        let result = network
            .get_session_sigs(request(), &WrongUriCallback(LocalWallet::random()))
            .await;
        assert!(matches!(result, Err(NetworkError::InvalidAuthSig(_))));
    }

    #[tokio::test]
    async fn test_rejects_past_expiration() {
        let network = MemoryNetwork::default();
        network.connect().await.unwrap();
        let mut req = request();
        req.expiration = Utc::now() - chrono::Duration::seconds(1);

        let callback = HonestCallback {
            wallet: LocalWallet::random(),
            nonce: "0x0".into(),
        };
        assert!(matches!(
            network.get_session_sigs(req, &callback).await,
            Err(NetworkError::Node(_))
        ));
    }
}
