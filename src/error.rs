//! Error types for chainlab

use crate::contracts::Revert;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Bitcoin error: {0}")]
    Bitcoin(String),

    #[error("Insufficient funds: need {needed} sat, have {available} sat")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("Amount {amount} sat is below the dust limit of {limit} sat")]
    Dust { amount: u64, limit: u64 },

    #[error("Explorer error: {0}")]
    Explorer(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Transaction {0} failed on chain")]
    TransactionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<Revert> for LabError {
    fn from(revert: Revert) -> Self {
        LabError::Reverted(revert.reason().to_string())
    }
}

impl From<bip39::Error> for LabError {
    fn from(err: bip39::Error) -> Self {
        LabError::Wallet(format!("Invalid mnemonic: {}", err))
    }
}

impl From<bitcoin::bip32::Error> for LabError {
    fn from(err: bitcoin::bip32::Error) -> Self {
        LabError::Crypto(format!("Key derivation failed: {}", err))
    }
}

impl From<reqwest::Error> for LabError {
    fn from(err: reqwest::Error) -> Self {
        LabError::Explorer(err.to_string())
    }
}

impl From<toml::de::Error> for LabError {
    fn from(err: toml::de::Error) -> Self {
        LabError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LabError>;
