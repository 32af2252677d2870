//! # Keypo Core
//!
//! Core primitives for gating encrypted records behind on-chain conditions.
//!
//! ## Key Concepts
//!
//! - **AccessCondition**: either a registry contract permission check or a
//!   balance-style comparison. Exactly one shape guards a record.
//! - **ResourceScope**: `sha256(conditions)/dataToEncryptHash`, binding a
//!   condition set to one ciphertext.
//! - **SiweMessage**: the login message a wallet signs, carrying the
//!   requested abilities as a ReCap.
//! - **Signer**: any wallet that can report an address and `personal_sign`.
//!
//! ## Usage
//!
//! ```rust
//! use keypo_core::{AccessCondition, ChainName, ConditionSet, DataIdentifier, ResourceScope};
//!
//! let id = DataIdentifier::new("doc-123").unwrap();
//! let condition = AccessCondition::contract_permission(
//!     ChainName::default(),
//!     "0x0000000000000000000000000000000000000001",
//!     &id,
//! )
//! .unwrap();
//! let conditions = ConditionSet::single(condition);
//! let scope = ResourceScope::derive(&conditions, "0xabc").unwrap();
//! assert!(scope.as_str().ends_with("/0xabc"));
//! ```

pub mod auth;
pub mod condition;
pub mod crypto;
pub mod error;
pub mod metadata;
pub mod resource;
pub mod siwe;
pub mod types;
pub mod wallet;

pub use auth::{AuthSig, SessionSig, SessionSigs, PERSONAL_SIGN};
pub use condition::{
    AccessCondition, BalanceStyle, Comparator, ConditionKind, ConditionSet, ContractPermission,
};
pub use crypto::{eip191_hash, keccak256, RecoverableSignature, Sha256Hash};
pub use error::{CoreError, Result, SignerError};
pub use metadata::{DataMetadata, ProxyMetadata};
pub use resource::{
    decryption_session_resources, LitAbility, LitResource, ResourceAbilityRequest, ResourceScope,
};
pub use siwe::{format_timestamp, parse_timestamp, ParsedSiwe, Recap, SiweMessage};
pub use types::{ChainName, DataIdentifier, EvmAddress};
pub use wallet::{LocalWallet, Signer};
