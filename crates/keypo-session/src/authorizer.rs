//! The session authorizer.
//!
//! Turns a data identifier into everything needed to decrypt it: the
//! record's metadata, the access condition guarding it, a session
//! credential from the access-control network, and a standalone wallet
//! signature over the same resources.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use keypo_api::MetadataSource;
use keypo_core::{
    decryption_session_resources, parse_timestamp, AccessCondition, AuthSig, ChainName,
    ConditionSet, CoreError, DataIdentifier, DataMetadata, EvmAddress, ResourceAbilityRequest,
    ResourceScope, SessionSigs, Signer, SiweMessage,
};

use crate::error::{AuthStage, AuthorizationError, CallbackError, NetworkError, Result};
use crate::network::{AccessControlNetwork, AuthCallbackParams, AuthNeededCallback, SessionSigsRequest};

/// URI the standalone authorization signature is bound to.
pub const STANDALONE_URI: &str = "https://www.keypo.io";

/// Configuration for the authorizer.
#[derive(Debug, Clone)]
pub struct AuthorizerConfig {
    /// Domain line of every SIWE message.
    pub siwe_domain: String,
    /// `Chain ID` field of every SIWE message.
    pub siwe_chain_id: u64,
    /// URI of the standalone signature.
    pub standalone_uri: String,
    /// Lifetime of the standalone signature when the request does not set one.
    pub auth_sig_ttl: Duration,
    /// Delegated capacity forwarded with every session request.
    pub capacity_delegation_auth_sig: Option<AuthSig>,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            siwe_domain: "localhost".to_string(),
            siwe_chain_id: 1,
            standalone_uri: STANDALONE_URI.to_string(),
            auth_sig_ttl: Duration::hours(24),
            capacity_delegation_auth_sig: None,
        }
    }
}

/// What to authorize.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub chain: ChainName,
    /// Session expiration. Must be in the future.
    pub expiration: DateTime<Utc>,
    /// Permission registry contract consulted by the contract condition.
    pub registry_address: String,
    pub data_identifier: DataIdentifier,
    /// Expiration of the standalone signature; defaults to the configured TTL.
    pub auth_sig_expiration: Option<DateTime<Utc>>,
}

impl AuthorizeRequest {
    /// A request on the default chain.
    pub fn new(
        data_identifier: DataIdentifier,
        registry_address: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            chain: ChainName::default(),
            expiration,
            registry_address: registry_address.into(),
            data_identifier,
            auth_sig_expiration: None,
        }
    }

    /// Set the chain.
    pub fn chain(mut self, chain: ChainName) -> Self {
        self.chain = chain;
        self
    }

    /// Set the standalone signature expiration.
    pub fn auth_sig_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.auth_sig_expiration = Some(expiration);
        self
    }
}

/// Result of a successful authorization.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub session_sigs: SessionSigs,
    /// Standalone signature bound to the standalone URI.
    pub auth_sig: AuthSig,
    pub data_to_encrypt_hash: String,
    /// The conditions the scope was derived from.
    pub conditions: ConditionSet,
    pub metadata: DataMetadata,
    pub scope: ResourceScope,
    pub resource_ability_requests: Vec<ResourceAbilityRequest>,
    /// Address of the signer that authorized the session.
    pub address: EvmAddress,
}

/// Pick the access condition for a record.
///
/// Proxied records (those with `proxyMetadata`) are gated by the proxy
/// address; all others by the permission registry.
pub fn select_conditions(
    metadata: &DataMetadata,
    chain: &ChainName,
    registry_address: &str,
    data_identifier: &DataIdentifier,
) -> std::result::Result<ConditionSet, CoreError> {
    let condition = match metadata.proxy() {
        Some(proxy) => AccessCondition::balance_style(chain.clone(), proxy.proxy_address.clone())?,
        None => AccessCondition::contract_permission(chain.clone(), registry_address, data_identifier)?,
    };
    Ok(ConditionSet::single(condition))
}

/// Auth callback that signs SIWE + ReCap messages with a wallet.
///
/// Holds a fixed nonce so every invocation within one authorization uses
/// the same one.
pub struct WalletAuthCallback<'s, S: Signer + ?Sized> {
    signer: &'s S,
    address: EvmAddress,
    nonce: String,
    domain: String,
    chain_id: u64,
}

impl<'s, S: Signer + ?Sized> WalletAuthCallback<'s, S> {
    pub fn new(
        signer: &'s S,
        address: EvmAddress,
        nonce: impl Into<String>,
        config: &AuthorizerConfig,
    ) -> Self {
        Self {
            signer,
            address,
            nonce: nonce.into(),
            domain: config.siwe_domain.clone(),
            chain_id: config.siwe_chain_id,
        }
    }

    /// The nonce bound into every message.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Sign a message for `uri` covering `resources` until `expiration`.
    pub async fn sign_for(
        &self,
        uri: &str,
        expiration: DateTime<Utc>,
        resources: &[ResourceAbilityRequest],
    ) -> std::result::Result<AuthSig, CallbackError> {
        let message = SiweMessage::new(
            self.domain.clone(),
            self.address,
            uri,
            self.chain_id,
            self.nonce.clone(),
            Utc::now(),
        )
        .expires_at(expiration)
        .with_recaps(resources)?;

        Ok(AuthSig::sign(self.signer, &message).await?)
    }
}

#[async_trait]
impl<'s, S: Signer + ?Sized> AuthNeededCallback for WalletAuthCallback<'s, S> {
    async fn call(&self, params: AuthCallbackParams) -> std::result::Result<AuthSig, CallbackError> {
        let uri = params
            .uri
            .filter(|u| !u.is_empty())
            .ok_or(CallbackError::MissingParameter("uri"))?;
        let expiration = params
            .expiration
            .filter(|e| !e.is_empty())
            .ok_or(CallbackError::MissingParameter("expiration"))?;
        let resources = params
            .resource_ability_requests
            .filter(|r| !r.is_empty())
            .ok_or(CallbackError::MissingParameter("resourceAbilityRequests"))?;

        let expiration = parse_timestamp(&expiration)?;
        tracing::debug!(%uri, nonce = %self.nonce, "signing session proof");
        self.sign_for(&uri, expiration, &resources).await
    }
}

/// Authorizes decryption sessions for records.
///
/// Borrows its network and metadata source; both must outlive it.
pub struct SessionAuthorizer<'a, N: ?Sized, M: ?Sized> {
    network: &'a N,
    metadata: &'a M,
    config: AuthorizerConfig,
}

impl<'a, N, M> SessionAuthorizer<'a, N, M>
where
    N: AccessControlNetwork + ?Sized,
    M: MetadataSource + ?Sized,
{
    /// Create an authorizer.
    pub fn new(network: &'a N, metadata: &'a M, config: AuthorizerConfig) -> Self {
        Self {
            network,
            metadata,
            config,
        }
    }

    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    /// Run the full authorization flow.
    ///
    /// Stops at the first failing stage and returns its error unchanged.
    pub async fn authorize<S: Signer + ?Sized>(
        &self,
        signer: &S,
        request: &AuthorizeRequest,
    ) -> Result<Authorization> {
        match self.run(signer, request).await {
            Ok(authorization) => {
                tracing::info!(
                    identifier = %request.data_identifier,
                    scope = %authorization.scope,
                    nodes = authorization.session_sigs.len(),
                    "session authorized"
                );
                Ok(authorization)
            }
            Err(e) => {
                tracing::error!(
                    stage = %e.stage(),
                    identifier = %request.data_identifier,
                    error = %e,
                    "authorization failed"
                );
                Err(e)
            }
        }
    }

    async fn run<S: Signer + ?Sized>(
        &self,
        signer: &S,
        request: &AuthorizeRequest,
    ) -> Result<Authorization> {
        let now = Utc::now();
        validate(request, now)?;

        // Step 1: signer address
        let address = signer.address().await.map_err(|e| {
            tracing::error!(error = %e, "signer has no address");
            AuthorizationError::Signer(e)
        })?;
        tracing::debug!(%address, "resolved signer");

        // Step 2: fetch metadata
        let identifier = &request.data_identifier;
        let text = self
            .metadata
            .file_metadata(identifier)
            .await
            .map_err(|source| {
                tracing::error!(%identifier, error = %source, "metadata fetch failed");
                AuthorizationError::MetadataFetch {
                    identifier: identifier.to_string(),
                    source,
                }
            })?;

        // Step 3: parse
        let metadata = DataMetadata::parse(&text).map_err(|source| {
            tracing::error!(
                %identifier,
                line = source.line(),
                column = source.column(),
                "metadata is not valid JSON"
            );
            AuthorizationError::MetadataParse {
                identifier: identifier.to_string(),
                source,
            }
        })?;

        // Step 4: condition
        let conditions = select_conditions(
            &metadata,
            &request.chain,
            &request.registry_address,
            identifier,
        )
        .map_err(AuthorizationError::Condition)?;
        tracing::debug!(kind = ?conditions.kind(), "selected access condition");

        // Step 5: resource scope
        let data_to_encrypt_hash = metadata
            .data_to_encrypt_hash()
            .ok_or_else(|| {
                tracing::error!(%identifier, "metadata has no data hash");
                AuthorizationError::ScopeDerivation(
                    "metadata has no encryptedData.dataToEncryptHash".to_string(),
                )
            })?
            .to_string();
        let scope = ResourceScope::derive(&conditions, &data_to_encrypt_hash)
            .map_err(|e| AuthorizationError::ScopeDerivation(e.to_string()))?;
        let resources = decryption_session_resources(&scope);

        // Step 6: session credential, one nonce for the whole call
        let nonce = self
            .network
            .latest_blockhash()
            .await
            .map_err(|source| AuthorizationError::Network {
                stage: AuthStage::FetchNonce,
                source,
            })?;
        let callback = WalletAuthCallback::new(signer, address, nonce, &self.config);

        let session_sigs = self
            .network
            .get_session_sigs(
                SessionSigsRequest {
                    chain: request.chain.clone(),
                    expiration: request.expiration,
                    resource_ability_requests: resources.clone(),
                    capacity_delegation_auth_sig: self.config.capacity_delegation_auth_sig.clone(),
                },
                &callback,
            )
            .await
            .map_err(|e| match e {
                NetworkError::Callback(CallbackError::MissingParameter(name)) => {
                    AuthorizationError::CallbackParameter(name)
                }
                source => AuthorizationError::Network {
                    stage: AuthStage::RequestSession,
                    source,
                },
            })?;

        // Step 7: standalone signature
        let auth_sig_expiration = request
            .auth_sig_expiration
            .unwrap_or_else(|| Utc::now() + self.config.auth_sig_ttl);
        let auth_sig = callback
            .sign_for(&self.config.standalone_uri, auth_sig_expiration, &resources)
            .await
            .map_err(AuthorizationError::Signing)?;

        Ok(Authorization {
            session_sigs,
            auth_sig,
            data_to_encrypt_hash,
            conditions,
            metadata,
            scope,
            resource_ability_requests: resources,
            address,
        })
    }
}

fn validate(request: &AuthorizeRequest, now: DateTime<Utc>) -> Result<()> {
    if request.expiration <= now {
        return Err(AuthorizationError::InvalidRequest(format!(
            "expiration {} is not in the future",
            request.expiration
        )));
    }
    if request.registry_address.trim().is_empty() {
        return Err(AuthorizationError::InvalidRequest(
            "registry address is empty".to_string(),
        ));
    }
    if let Some(exp) = request.auth_sig_expiration {
        if exp <= now {
            return Err(AuthorizationError::InvalidRequest(format!(
                "auth signature expiration {exp} is not in the future"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::memory::{MemoryNetwork, MemoryNetworkConfig};
    use keypo_api::ApiError;
    use keypo_core::{ConditionKind, LitAbility, LocalWallet, ParsedSiwe, RecoverableSignature, SignerError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const REGISTRY: &str = "0x8a791620dd6260079bf849dc5567adc3f2fdc318";

    /// Metadata source backed by a map.
    struct StaticSource(HashMap<String, String>);

    impl StaticSource {
        fn with(id: &str, metadata: &str) -> Self {
            Self(HashMap::from([(id.to_string(), metadata.to_string())]))
        }
    }

    #[async_trait]
    impl MetadataSource for StaticSource {
        async fn file_metadata(&self, identifier: &DataIdentifier) -> keypo_api::Result<String> {
            self.0
                .get(identifier.as_str())
                .cloned()
                .ok_or(ApiError::Status {
                    status: 404,
                    body: "not found".into(),
                })
        }
    }

    /// Counts lookups against an inner source.
    struct CountingSource {
        inner: StaticSource,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl MetadataSource for CountingSource {
        async fn file_metadata(&self, identifier: &DataIdentifier) -> keypo_api::Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.file_metadata(identifier).await
        }
    }

    /// A wallet that has not been provisioned yet.
    struct UnprovisionedSigner;

    #[async_trait]
    impl Signer for UnprovisionedSigner {
        async fn address(&self) -> std::result::Result<EvmAddress, SignerError> {
            Err(SignerError::Unavailable("no account".into()))
        }

        async fn sign_message(
            &self,
            _message: &[u8],
        ) -> std::result::Result<RecoverableSignature, SignerError> {
            Err(SignerError::Unavailable("no account".into()))
        }

        async fn sign_hash(
            &self,
            _digest: &[u8; 32],
        ) -> std::result::Result<RecoverableSignature, SignerError> {
            Err(SignerError::Unavailable("no account".into()))
        }
    }

    /// Network that asks for wallet proof without a session URI.
    struct UriLessNetwork;

    #[async_trait]
    impl AccessControlNetwork for UriLessNetwork {
        async fn connect(&self) -> std::result::Result<(), NetworkError> {
            Ok(())
        }

        async fn disconnect(&self) -> std::result::Result<(), NetworkError> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn latest_blockhash(&self) -> std::result::Result<String, NetworkError> {
            Ok("0x01".into())
        }

        async fn get_session_sigs(
            &self,
            request: SessionSigsRequest,
            callback: &dyn AuthNeededCallback,
        ) -> std::result::Result<SessionSigs, NetworkError> {
            callback
                .call(AuthCallbackParams {
                    uri: None,
                    expiration: Some(keypo_core::format_timestamp(&request.expiration)),
                    resource_ability_requests: Some(request.resource_ability_requests),
                })
                .await?;
            Err(NetworkError::Node("proof accepted without a uri".into()))
        }
    }

    fn doc() -> DataIdentifier {
        DataIdentifier::new("doc-123").unwrap()
    }

    fn request() -> AuthorizeRequest {
        AuthorizeRequest::new(doc(), REGISTRY, Utc::now() + Duration::minutes(10))
    }

    async fn connected(config: MemoryNetworkConfig) -> MemoryNetwork {
        let network = MemoryNetwork::new(config);
        network.connect().await.unwrap();
        network
    }

    #[test]
    fn test_select_contract_permission() {
        let meta = DataMetadata::parse(r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#).unwrap();
        let set = select_conditions(&meta, &ChainName::default(), REGISTRY, &doc()).unwrap();
        assert_eq!(set.len(), 1);
        match &set.conditions()[0] {
            AccessCondition::ContractPermission(c) => {
                assert_eq!(c.contract_address, REGISTRY);
                assert_eq!(c.params[0], "doc-123");
            }
            other => panic!("unexpected condition {other:?}"),
        }
    }

    #[test]
    fn test_select_balance_style() {
        let meta = DataMetadata::parse(r#"{"proxyMetadata":{"proxyAddress":"0xProxy"}}"#).unwrap();
        let set = select_conditions(&meta, &ChainName::default(), REGISTRY, &doc()).unwrap();
        assert_eq!(set.len(), 1);
        match &set.conditions()[0] {
            AccessCondition::BalanceStyle(c) => assert_eq!(c.value, "0xProxy"),
            other => panic!("unexpected condition {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_authorize_contract_record() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#);
        let wallet = LocalWallet::random();

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let auth = authorizer.authorize(&wallet, &request()).await.unwrap();

        assert_eq!(auth.data_to_encrypt_hash, "0xabc");
        assert_eq!(auth.conditions.kind(), Some(ConditionKind::ContractPermission));
        assert!(auth.scope.as_str().ends_with("/0xabc"));
        assert_eq!(auth.session_sigs.len(), 3);
        assert_eq!(auth.address, wallet.evm_address());

        let abilities: Vec<_> = auth.resource_ability_requests.iter().map(|r| r.ability).collect();
        assert_eq!(
            abilities,
            vec![LitAbility::LitActionExecution, LitAbility::AccessControlConditionDecryption]
        );
    }

    #[tokio::test]
    async fn test_standalone_signature() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#);
        let wallet = LocalWallet::random();

        let before = Utc::now();
        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let auth = authorizer.authorize(&wallet, &request()).await.unwrap();

        assert_eq!(auth.auth_sig.verify().unwrap(), wallet.evm_address());
        let parsed = ParsedSiwe::parse(&auth.auth_sig.signed_message).unwrap();
        assert_eq!(parsed.uri, STANDALONE_URI);

        let expires = parsed.expiration_time.unwrap();
        assert!(expires >= before + Duration::hours(24) - Duration::seconds(1));
        assert!(expires <= Utc::now() + Duration::hours(24));

        let recap = parsed.recap().unwrap().unwrap();
        assert!(recap.grants(&format!("lit-accesscontrolcondition://{}", auth.scope), "Threshold/Decryption"));
        assert!(recap.grants("lit-litaction://*", "Threshold/Execution"));
    }

    #[tokio::test]
    async fn test_custom_auth_sig_expiration() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#);
        let custom = parse_timestamp("2099-01-01T00:00:00.000Z").unwrap();

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let auth = authorizer
            .authorize(&LocalWallet::random(), &request().auth_sig_expiration(custom))
            .await
            .unwrap();

        let parsed = ParsedSiwe::parse(&auth.auth_sig.signed_message).unwrap();
        assert_eq!(parsed.expiration_time, Some(custom));
    }

    #[tokio::test]
    async fn test_nonce_shared_across_rounds() {
        let network = connected(MemoryNetworkConfig {
            proof_rounds: 3,
            ..Default::default()
        })
        .await;
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#);

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let auth = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap();

        let nonces = network.nonces_seen();
        assert_eq!(nonces.len(), 3);
        assert!(nonces.iter().all(|n| n == &nonces[0]));
        assert_eq!(network.blockhash_requests(), 1);

        let standalone = ParsedSiwe::parse(&auth.auth_sig.signed_message).unwrap();
        assert_eq!(standalone.nonce, nonces[0]);
    }

    #[tokio::test]
    async fn test_callback_not_invoked_when_not_needed() {
        let network = connected(MemoryNetworkConfig {
            proof_rounds: 0,
            ..Default::default()
        })
        .await;
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#);

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap();
        assert_eq!(network.callback_invocations(), 0);
    }

    #[tokio::test]
    async fn test_missing_record_fails_at_fetch() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource(HashMap::new());

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap_err();

        assert_eq!(err.stage(), AuthStage::FetchMetadata);
        assert_eq!(network.blockhash_requests(), 0);
    }

    #[tokio::test]
    async fn test_malformed_metadata_never_reaches_network() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with("doc-123", "{not json");

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap_err();

        assert!(matches!(err, AuthorizationError::MetadataParse { .. }));
        assert_eq!(network.blockhash_requests(), 0);
        assert!(network.session_requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_hash_fails_scope() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with("doc-123", r#"{"proxyMetadata":{"proxyAddress":"0xProxy"}}"#);

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap_err();

        assert!(matches!(err, AuthorizationError::ScopeDerivation(_)));
        assert_eq!(network.blockhash_requests(), 0);
    }

    #[tokio::test]
    async fn test_wrongly_shaped_metadata_fails_scope() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with("doc-123", r#"{"encryptedData":"x"}"#);

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap_err();

        assert_eq!(err.stage(), AuthStage::DeriveScope);
        assert_eq!(network.blockhash_requests(), 0);
    }

    #[tokio::test]
    async fn test_numeric_hash_is_used_as_text() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":123}}"#);

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let auth = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap();

        assert_eq!(auth.data_to_encrypt_hash, "123");
        assert!(auth.scope.as_str().ends_with("/123"));
    }

    #[tokio::test]
    async fn test_false_proxy_uses_registry() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource::with(
            "doc-123",
            r#"{"encryptedData":{"dataToEncryptHash":"0xabc"},"proxyMetadata":false}"#,
        );

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let auth = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap();

        assert_eq!(auth.conditions.kind(), Some(ConditionKind::ContractPermission));
        assert_eq!(
            auth.scope.as_str(),
            "7bf20085b31b8603a919d69dfbb4701fc6fb11e0b3d77207065589afcbfda46a/0xabc"
        );
    }

    #[tokio::test]
    async fn test_unavailable_signer_stops_before_fetch() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = CountingSource {
            inner: StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#),
            fetches: AtomicUsize::new(0),
        };

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&UnprovisionedSigner, &request()).await.unwrap_err();

        assert!(matches!(err, AuthorizationError::Signer(SignerError::Unavailable(_))));
        assert_eq!(err.stage(), AuthStage::ResolveSigner);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(network.blockhash_requests(), 0);
    }

    #[tokio::test]
    async fn test_callback_without_uri() {
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#);

        let authorizer = SessionAuthorizer::new(&UriLessNetwork, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap_err();

        assert!(matches!(err, AuthorizationError::CallbackParameter("uri")));
        assert_eq!(err.stage(), AuthStage::RequestSession);
    }

    #[tokio::test]
    async fn test_past_expiration_rejected() {
        let network = connected(MemoryNetworkConfig::default()).await;
        let source = StaticSource(HashMap::new());
        let req = AuthorizeRequest::new(doc(), REGISTRY, Utc::now() - Duration::seconds(5));

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&LocalWallet::random(), &req).await.unwrap_err();
        assert!(matches!(err, AuthorizationError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_disconnected_network_fails_at_nonce() {
        let network = MemoryNetwork::default();
        let source = StaticSource::with("doc-123", r#"{"encryptedData":{"dataToEncryptHash":"0xabc"}}"#);

        let authorizer = SessionAuthorizer::new(&network, &source, AuthorizerConfig::default());
        let err = authorizer.authorize(&LocalWallet::random(), &request()).await.unwrap_err();

        assert!(matches!(
            err,
            AuthorizationError::Network {
                stage: AuthStage::FetchNonce,
                source: NetworkError::NotConnected
            }
        ));
    }

    #[tokio::test]
    async fn test_callback_requires_parameters() {
        let wallet = LocalWallet::random();
        let config = AuthorizerConfig::default();
        let callback = WalletAuthCallback::new(&wallet, wallet.evm_address(), "0x01", &config);

        let err = callback
            .call(AuthCallbackParams {
                uri: Some("lit:session:abc".into()),
                expiration: None,
                resource_ability_requests: Some(vec![ResourceAbilityRequest::execute_any_action()]),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::MissingParameter("expiration")));

        let err = callback
            .call(AuthCallbackParams {
                uri: Some(String::new()),
                expiration: Some("2099-01-01T00:00:00.000Z".into()),
                resource_ability_requests: Some(vec![ResourceAbilityRequest::execute_any_action()]),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::MissingParameter("uri")));

        let err = callback
            .call(AuthCallbackParams {
                uri: Some("lit:session:abc".into()),
                expiration: Some("2099-01-01T00:00:00.000Z".into()),
                resource_ability_requests: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CallbackError::MissingParameter("resourceAbilityRequests")));
    }

    #[tokio::test]
    async fn test_callback_binds_nonce_and_address() {
        let wallet = LocalWallet::random();
        let config = AuthorizerConfig::default();
        let callback = WalletAuthCallback::new(&wallet, wallet.evm_address(), "0xfeed", &config);

        let sig = callback
            .call(AuthCallbackParams {
                uri: Some("lit:session:abc".into()),
                expiration: Some("2099-01-01T00:00:00.000Z".into()),
                resource_ability_requests: Some(vec![ResourceAbilityRequest::execute_any_action()]),
            })
            .await
            .unwrap();

        assert_eq!(sig.verify().unwrap(), wallet.evm_address());
        let parsed = ParsedSiwe::parse(&sig.signed_message).unwrap();
        assert_eq!(parsed.nonce, "0xfeed");
        assert_eq!(parsed.uri, "lit:session:abc");
    }
}
