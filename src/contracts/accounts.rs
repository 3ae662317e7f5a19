//! Deterministic developer accounts
//!
//! Local development nodes fund ten accounts derived from a well-known
//! mnemonic along `m/44'/60'/0'/0/i`. The same accounts drive the
//! in-process contracts so scripts behave identically against either.

use crate::config::EthereumConfig;
use crate::crypto::{KeyPair, SECP256K1_CONTEXT};
use crate::error::Result;
use alloy::primitives::Address;
use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::NetworkKind;
use std::ops::Index;
use std::str::FromStr;
use tracing::debug;

pub const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";
pub const DEV_ACCOUNT_COUNT: usize = 10;
const ETH_ACCOUNT_PATH: &str = "m/44'/60'/0'/0";

#[derive(Debug, Clone)]
pub struct DevAccounts {
    keys: Vec<KeyPair>,
}

impl DevAccounts {
    /// Derives `count` accounts from `phrase`.
    pub fn derive(phrase: &str, count: usize) -> Result<Self> {
        let mnemonic = Mnemonic::parse_normalized(phrase)?;
        let master = Xpriv::new_master(NetworkKind::Main, &mnemonic.to_seed(""))?;
        let base = DerivationPath::from_str(ETH_ACCOUNT_PATH)?;
        let parent = master.derive_priv(&SECP256K1_CONTEXT, &base)?;

        let mut keys = Vec::with_capacity(count);
        for index in 0..count as u32 {
            let path = DerivationPath::from_str(&format!("m/{}", index))?;
            let child = parent.derive_priv(&SECP256K1_CONTEXT, &path)?;
            keys.push(KeyPair::from_secret_key(child.private_key));
        }
        Ok(DevAccounts { keys })
    }

    pub fn get(&self, index: usize) -> Option<&KeyPair> {
        self.keys.get(index)
    }

    pub fn address(&self, index: usize) -> Option<Address> {
        self.get(index).map(KeyPair::eth_address)
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.keys.iter().map(KeyPair::eth_address).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPair> {
        self.keys.iter()
    }
}

impl Index<usize> for DevAccounts {
    type Output = KeyPair;

    fn index(&self, index: usize) -> &KeyPair {
        &self.keys[index]
    }
}

/// The standard ten developer accounts.
pub fn dev_accounts() -> Result<DevAccounts> {
    DevAccounts::derive(DEV_MNEMONIC, DEV_ACCOUNT_COUNT)
}

/// Signing account for scripts: the configured private key when present,
/// otherwise the first developer account.
pub fn get_account(config: &EthereumConfig) -> Result<KeyPair> {
    match config.configured_key() {
        Some(key) => {
            debug!("Using account from configured private key");
            KeyPair::from_secret_hex(key)
        }
        None => {
            debug!("Using developer account 0");
            Ok(dev_accounts()?[0].clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::to_checksum;

    #[test]
    fn test_known_dev_accounts() {
        let accounts = dev_accounts().unwrap();
        assert_eq!(accounts.len(), DEV_ACCOUNT_COUNT);
        assert_eq!(
            to_checksum(&accounts[0].eth_address()),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(
            accounts[0].secret_hex(),
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        );
        assert_eq!(
            to_checksum(&accounts[1].eth_address()),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        );
    }

    #[test]
    fn test_accounts_are_distinct() {
        let accounts = dev_accounts().unwrap();
        let mut addresses = accounts.addresses();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), DEV_ACCOUNT_COUNT);
        assert!(accounts.get(DEV_ACCOUNT_COUNT).is_none());
    }

    #[test]
    fn test_get_account_prefers_configured_key() {
        let mut config = EthereumConfig::default();
        let fallback = get_account(&config).unwrap();
        assert_eq!(
            to_checksum(&fallback.eth_address()),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        config.private_key = Some(
            "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d".to_string(),
        );
        let configured = get_account(&config).unwrap();
        assert_eq!(
            to_checksum(&configured.eth_address()),
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
        );
    }

    #[test]
    fn test_get_account_blank_key_uses_dev_account() {
        let config = EthereumConfig {
            private_key: Some("   ".to_string()),
            ..EthereumConfig::default()
        };
        assert_eq!(config.configured_key(), None);
        let account = get_account(&config).unwrap();
        assert_eq!(account.eth_address(), dev_accounts().unwrap()[0].eth_address());
    }

    #[test]
    fn test_get_account_bad_key() {
        let config = EthereumConfig {
            private_key: Some("1234".to_string()),
            ..EthereumConfig::default()
        };
        assert!(get_account(&config).is_err());
    }
}
