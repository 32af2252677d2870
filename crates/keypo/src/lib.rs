//! # Keypo
//!
//! The unified API for Keypo: encrypted records whose decryption is gated
//! by on-chain access conditions.
//!
//! ## Overview
//!
//! - **Records**: data encrypted and stored by an external encryption SDK
//! - **Access conditions**: a permission-registry check, or a proxy check
//!   for records served through a proxy action
//! - **Sessions**: time-boxed credentials from the access-control network,
//!   obtained by signing a SIWE message with ReCap resources
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keypo::{Keypo, KeypoConfig, NetworkHandle};
//! use keypo::api::MetadataApi;
//! use keypo::core::LocalWallet;
//! use keypo::session::MemoryNetwork;
//!
//! async fn example(sdk: impl keypo::EncryptionSdk) -> keypo::Result<()> {
//!     let config = KeypoConfig::from_env()?;
//!     let api = MetadataApi::new(config.api_url.clone())?;
//!     let network = NetworkHandle::connect(MemoryNetwork::default()).await?;
//!
//!     let keypo = Keypo::new(network, api, sdk, config);
//!     let wallet = LocalWallet::random();
//!     let decrypted = keypo.decrypt_default(&wallet).await?;
//!     println!("{}", decrypted.result);
//!
//!     keypo.release().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `keypo::core` - Identifiers, addresses, conditions, SIWE, wallets
//! - `keypo::api` - Metadata and decryption HTTP client
//! - `keypo::session` - Session authorizer and network seam

pub mod client;
pub mod config;
pub mod error;
pub mod handle;
pub mod sdk;
pub mod status;

// Re-export component crates
pub use keypo_api as api;
pub use keypo_core as core;
pub use keypo_session as session;

pub use client::{Decrypted, Keypo};
pub use config::{ConfigError, KeypoConfig, BASE_SEPOLIA_CHAIN_ID};
pub use error::{KeypoError, Result};
pub use handle::NetworkHandle;
pub use sdk::{
    DelegationAuthorization, EncryptRequest, EncryptResult, EncryptionSdk,
    KERNEL_V3_3_IMPLEMENTATION,
};
pub use status::{Attempt, DecryptStatus, StatusError, StatusMachine, CANCELLED};

pub use keypo_core::{DataIdentifier, EvmAddress, LocalWallet, Signer};
