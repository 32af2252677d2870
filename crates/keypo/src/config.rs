//! Environment configuration.

use chrono::Duration;
use thiserror::Error;

use keypo_core::{ChainName, DataIdentifier};

pub const ENV_DATA_IDENTIFIER: &str = "KEYPO_DATA_IDENTIFIER";
pub const ENV_API_URL: &str = "KEYPO_API_URL";
pub const ENV_REGISTRY_CONTRACT_ADDRESS: &str = "KEYPO_REGISTRY_CONTRACT_ADDRESS";
pub const ENV_BUNDLER_RPC_URL: &str = "KEYPO_BUNDLER_RPC_URL";
pub const ENV_VALIDATOR_CONTRACT_ADDRESS: &str = "KEYPO_VALIDATOR_CONTRACT_ADDRESS";
pub const ENV_CHAIN: &str = "KEYPO_CHAIN";
pub const ENV_CHAIN_ID: &str = "KEYPO_CHAIN_ID";
pub const ENV_SESSION_TTL_SECS: &str = "KEYPO_SESSION_TTL_SECS";
pub const ENV_DEBUG: &str = "KEYPO_DEBUG";

/// Chain ID of Base Sepolia.
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

/// Default lifetime of a decryption session.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 600;

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but unusable.
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct KeypoConfig {
    /// Record decrypted by default.
    pub data_identifier: DataIdentifier,
    /// Base URL of the Keypo API.
    pub api_url: String,
    /// Permission registry contract.
    pub registry_contract_address: String,
    /// Account-abstraction bundler endpoint.
    pub bundler_rpc_url: String,
    /// Permission validator contract.
    pub validator_contract_address: String,
    pub chain: ChainName,
    pub chain_id: u64,
    /// Lifetime of decryption sessions.
    pub session_ttl: Duration,
    /// Verbose SDK output.
    pub debug: bool,
}

impl KeypoConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// Required variables are checked in a fixed order and the first
    /// missing one is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let data_identifier = DataIdentifier::new(require(ENV_DATA_IDENTIFIER)?).map_err(|e| {
            ConfigError::Invalid {
                name: ENV_DATA_IDENTIFIER,
                reason: e.to_string(),
            }
        })?;
        let api_url = require(ENV_API_URL)?;
        let registry_contract_address = require(ENV_REGISTRY_CONTRACT_ADDRESS)?;
        let bundler_rpc_url = require(ENV_BUNDLER_RPC_URL)?;
        let validator_contract_address = require(ENV_VALIDATOR_CONTRACT_ADDRESS)?;

        let chain = match get(ENV_CHAIN) {
            Some(name) => ChainName::new(name).map_err(|e| ConfigError::Invalid {
                name: ENV_CHAIN,
                reason: e.to_string(),
            })?,
            None => ChainName::default(),
        };
        let chain_id = parse_or(get(ENV_CHAIN_ID), ENV_CHAIN_ID, BASE_SEPOLIA_CHAIN_ID)?;
        let ttl_secs: i64 = parse_or(get(ENV_SESSION_TTL_SECS), ENV_SESSION_TTL_SECS, DEFAULT_SESSION_TTL_SECS)?;
        if ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: ENV_SESSION_TTL_SECS,
                reason: "must be positive".to_string(),
            });
        }
        let debug = matches!(
            get(ENV_DEBUG).as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes")
        );

        Ok(Self {
            data_identifier,
            api_url,
            registry_contract_address,
            bundler_rpc_url,
            validator_contract_address,
            chain,
            chain_id,
            session_ttl: Duration::seconds(ttl_secs),
            debug,
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
