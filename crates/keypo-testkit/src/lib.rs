//! # Keypo Testkit
//!
//! Testing utilities for Keypo.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Condition encodings and scope strings with known outputs
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic wallets, metadata documents, and configurations
//! - **Backends**: A scripted metadata/decryption API and an in-memory encryption SDK
//!
//! ## Golden Vectors
//!
//! ```rust
//! use keypo_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keypo_testkit::generators::MetadataParams;
//!
//! proptest! {
//!     #[test]
//!     fn metadata_round_trips(params: MetadataParams) {
//!         let parsed = keypo_core::DataMetadata::from_value(params.to_value());
//!         prop_assert_eq!(parsed.proxy().is_some(), params.proxy_address.is_some());
//!     }
//! }
//! ```
//!
//! ## Backends
//!
//! ```rust
//! use keypo_testkit::{fixtures, ScriptedSource};
//!
//! let source = ScriptedSource::new()
//!     .with_metadata(fixtures::DOC_ID, &fixtures::contract_metadata("0xabc"));
//! ```

pub mod fixtures;
pub mod generators;
pub mod source;
pub mod vault;
pub mod vectors;

pub use fixtures::{multi_party_wallets, wallet_from_seed, TestFixture};
pub use generators::MetadataParams;
pub use source::{Scripted, ScriptedSource};
pub use vault::MemoryVault;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
