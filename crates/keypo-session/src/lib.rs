//! # Keypo Session
//!
//! Session authorization against a decentralized access-control network.
//!
//! ## Overview
//!
//! Given a wallet and a data identifier, [`SessionAuthorizer::authorize`]
//! fetches the record's metadata, builds the access condition guarding it,
//! derives the resource scope binding that condition to the ciphertext, and
//! asks the network for a time-boxed session credential. The network calls
//! back into the wallet (through [`AuthNeededCallback`]) whenever it needs
//! fresh proof of ownership.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use keypo_api::MetadataApi;
//! use keypo_core::{DataIdentifier, LocalWallet};
//! use keypo_session::{
//!     AccessControlNetwork, AuthorizeRequest, AuthorizerConfig, MemoryNetwork, SessionAuthorizer,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let network = MemoryNetwork::default();
//!     network.connect().await?;
//!     let api = MetadataApi::new("https://api.keypo.io")?;
//!
//!     let authorizer = SessionAuthorizer::new(&network, &api, AuthorizerConfig::default());
//!     let request = AuthorizeRequest::new(
//!         DataIdentifier::new("doc-123")?,
//!         "0x8a791620dd6260079bf849dc5567adc3f2fdc318",
//!         Utc::now() + Duration::minutes(10),
//!     );
//!     let authorization = authorizer.authorize(&LocalWallet::random(), &request).await?;
//!     println!("scope: {}", authorization.scope);
//!     Ok(())
//! }
//! ```
//!
//! ## Flow
//!
//! ```text
//! Authorizer                 Metadata API            Network
//!   |--- GET fileMetadata ------>|                      |
//!   |<-- metadata ---------------|                      |
//!   |   (condition, scope)                              |
//!   |--- latest_blockhash ------------------------------>|
//!   |--- get_session_sigs ------------------------------>|
//!   |<-- auth callback (0..n times, same nonce) ---------|
//!   |<-- session sigs -----------------------------------|
//!   |   (standalone signature)                          |
//! ```

pub mod authorizer;
pub mod error;
pub mod network;

pub use authorizer::{
    select_conditions, AuthorizeRequest, Authorization, AuthorizerConfig, SessionAuthorizer,
    WalletAuthCallback, STANDALONE_URI,
};
pub use error::{AuthStage, AuthorizationError, CallbackError, NetworkError, Result};
pub use network::{
    memory::MemoryNetwork, memory::MemoryNetworkConfig, AccessControlNetwork, AuthCallbackParams,
    AuthNeededCallback, SessionSigsRequest,
};
