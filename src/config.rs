//! Configuration management for chainlab
//!
//! Settings come from `chainlab.toml` in the working directory (or the file
//! named by `CHAINLAB_CONFIG`). Every field has a default, so a missing file
//! is not an error. A few environment variables win over the file:
//! `NODE` for the JSON-RPC endpoint and `PRIVATE_KEY` for the deployer key.

use crate::error::{LabError, Result};
use bitcoin::Network;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "CHAINLAB_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "chainlab.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bitcoin: BitcoinConfig,
    #[serde(default)]
    pub ethereum: EthereumConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitcoinConfig {
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_esplora_url")]
    pub esplora_url: String,
    #[serde(default = "default_account_path")]
    pub account_path: String,
    #[serde(default = "default_fee_sats")]
    pub fee_sats: u64,
}

impl Default for BitcoinConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            esplora_url: default_esplora_url(),
            account_path: default_account_path(),
            fee_sats: default_fee_sats(),
        }
    }
}

impl BitcoinConfig {
    pub fn network(&self) -> Result<Network> {
        self.network
            .parse::<Network>()
            .map_err(|e| LabError::Config(format!("Unknown bitcoin network '{}': {}", self.network, e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EthereumConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default = "default_gas_price_gwei")]
    pub gas_price_gwei: u64,
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    #[serde(default = "default_counter_address")]
    pub counter_address: String,
    #[serde(default)]
    pub votation_address: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            chain_id: None,
            gas_limit: default_gas_limit(),
            gas_price_gwei: default_gas_price_gwei(),
            confirmations: default_confirmations(),
            counter_address: default_counter_address(),
            votation_address: None,
            private_key: None,
        }
    }
}

impl EthereumConfig {
    /// Gas price in wei.
    pub fn gas_price_wei(&self) -> u128 {
        u128::from(self.gas_price_gwei) * 1_000_000_000
    }

    /// The RPC endpoint, or a configuration error when none is set.
    pub fn require_rpc_url(&self) -> Result<&str> {
        if self.rpc_url.trim().is_empty() {
            return Err(LabError::Config(
                "No JSON-RPC endpoint: set the NODE environment variable or ethereum.rpc_url".to_string(),
            ));
        }
        Ok(self.rpc_url.trim())
    }

    /// The configured private key, ignoring a blank entry.
    pub fn configured_key(&self) -> Option<&str> {
        self.private_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_wallet_dir")]
    pub dir: PathBuf,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            dir: default_wallet_dir(),
        }
    }
}

fn default_network() -> String {
    "testnet".to_string()
}

fn default_esplora_url() -> String {
    "https://blockstream.info/testnet/api".to_string()
}

fn default_account_path() -> String {
    "m/44'/1'/0'".to_string()
}

fn default_fee_sats() -> u64 {
    1_000
}

fn default_gas_limit() -> u64 {
    2_000_000
}

fn default_gas_price_gwei() -> u64 {
    20
}

fn default_confirmations() -> u64 {
    1
}

fn default_counter_address() -> String {
    "0x1f3569c66b9a8ab114a49d85229970e57e676211".to_string()
}

fn default_wallet_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chainlab")
        .join("wallets")
}

/// Parse a config from TOML text. Environment overrides are not applied.
pub fn parse_config(text: &str) -> Result<Config> {
    let mut config: Config = if text.trim().is_empty() {
        Config::default()
    } else {
        toml::from_str(text)?
    };
    if config.ethereum.configured_key().is_none() {
        config.ethereum.private_key = None;
    }
    validate(&config)?;
    Ok(config)
}

/// Load the config from `path`, falling back to defaults when the file is absent.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path).unwrap_or_default();
    let mut config = parse_config(&text)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn load_config() -> Result<Config> {
    let path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    tracing::debug!("Loading configuration from {}", path.display());
    load_config_from(&path)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(node) = std::env::var("NODE") {
        if !node.trim().is_empty() {
            config.ethereum.rpc_url = node;
        }
    }
    if let Ok(key) = std::env::var("PRIVATE_KEY") {
        if !key.trim().is_empty() {
            config.ethereum.private_key = Some(key);
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    config.bitcoin.network()?;

    if config.bitcoin.esplora_url.trim().is_empty() {
        return Err(LabError::Config("bitcoin.esplora_url must not be empty".to_string()));
    }

    if !config.bitcoin.account_path.starts_with('m') {
        return Err(LabError::Config(format!(
            "bitcoin.account_path must start with 'm', got '{}'",
            config.bitcoin.account_path
        )));
    }

    if config.ethereum.gas_limit == 0 {
        return Err(LabError::Config("ethereum.gas_limit must be positive".to_string()));
    }

    Ok(())
}
