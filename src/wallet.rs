//! Persisted wallet files
//!
//! Each wallet is one pretty-printed JSON file `<name>.json` inside the
//! wallet directory. Writes go to a temporary file first and are renamed
//! into place, so a crash never leaves a half-written wallet behind.

use crate::error::{LabError, Result};
use crate::hdwallet::{HdWallet, DEFAULT_ACCOUNT_PATH, MAX_ADDRESS_INDEX};
use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_WALLET_NAME: &str = "default";
const MAX_NAME_LENGTH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletFile {
    pub name: String,
    pub mnemonic: String,
    pub network: String,
    #[serde(default = "default_account_path")]
    pub account_path: String,
    /// RFC3339 timestamp when the wallet was created or restored
    pub created: String,
    #[serde(default)]
    pub next_receive: u32,
    #[serde(default)]
    pub next_change: u32,
}

fn default_account_path() -> String {
    DEFAULT_ACCOUNT_PATH.to_string()
}

impl WalletFile {
    /// Snapshot of an in-memory wallet under `name`.
    pub fn from_wallet(name: &str, wallet: &HdWallet) -> Result<Self> {
        validate_name(name)?;
        let (next_receive, next_change) = wallet.cursors();
        Ok(WalletFile {
            name: name.trim().to_string(),
            mnemonic: wallet.phrase(),
            network: wallet.network().to_string(),
            account_path: wallet.root_derivation(),
            created: chrono::Utc::now().to_rfc3339(),
            next_receive,
            next_change,
        })
    }

    pub fn network(&self) -> Result<Network> {
        self.network.parse::<Network>().map_err(|e| {
            LabError::Wallet(format!("Wallet '{}' has unknown network '{}': {}", self.name, self.network, e))
        })
    }

    /// Rebuilds the HD wallet, including its address cursors.
    pub fn open(&self) -> Result<HdWallet> {
        if self.next_receive >= MAX_ADDRESS_INDEX || self.next_change >= MAX_ADDRESS_INDEX {
            return Err(LabError::Wallet(format!(
                "Wallet '{}' has address cursors out of range ({}, {})",
                self.name, self.next_receive, self.next_change
            )));
        }
        let mut wallet = HdWallet::from_phrase_with_path(&self.mnemonic, self.network()?, &self.account_path)?;
        wallet.set_cursors(self.next_receive, self.next_change);
        Ok(wallet)
    }

    /// Copies the wallet's cursors back into the file contents.
    pub fn update_from(&mut self, wallet: &HdWallet) {
        let (next_receive, next_change) = wallet.cursors();
        self.next_receive = next_receive;
        self.next_change = next_change;
    }

    /// Save to `path` with an atomic write.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| LabError::Wallet(format!("Failed to create temp file: {}", e)))?;
        file.write_all(json.as_bytes())
            .map_err(|e| LabError::Wallet(format!("Failed to write wallet: {}", e)))?;
        file.sync_all()
            .map_err(|e| LabError::Wallet(format!("Failed to sync file: {}", e)))?;
        drop(file);

        fs::rename(&temp_path, path)
            .map_err(|e| LabError::Wallet(format!("Failed to finalize write: {}", e)))?;

        debug!("Saved wallet '{}' to {}", self.name, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            LabError::Wallet(format!("Failed to read wallet {}: {}", path.display(), e))
        })?;
        let wallet: WalletFile = serde_json::from_str(&contents)?;
        validate_name(&wallet.name)?;
        Ok(wallet)
    }
}

/// Wallet directory with one file per named wallet.
#[derive(Debug, Clone)]
pub struct WalletStore {
    dir: PathBuf,
}

impl WalletStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        WalletStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name.trim()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Writes a new wallet, refusing to overwrite an existing one.
    pub fn create(&self, file: &WalletFile) -> Result<PathBuf> {
        let path = self.path_for(&file.name);
        if path.exists() {
            return Err(LabError::Wallet(format!(
                "Wallet '{}' already exists at {}",
                file.name,
                path.display()
            )));
        }
        file.save(&path)?;
        info!("Created wallet '{}'", file.name);
        Ok(path)
    }

    /// Overwrites the stored copy of a wallet.
    pub fn store(&self, file: &WalletFile) -> Result<PathBuf> {
        let path = self.path_for(&file.name);
        file.save(&path)?;
        Ok(path)
    }

    pub fn load_named(&self, name: &str) -> Result<WalletFile> {
        validate_name(name)?;
        let path = self.path_for(name);
        if !path.exists() {
            return Err(LabError::Wallet(format!(
                "No wallet named '{}' in {}",
                name,
                self.dir.display()
            )));
        }
        WalletFile::load(&path)
    }

    pub fn load_default(&self) -> Result<WalletFile> {
        self.load_named(DEFAULT_WALLET_NAME)
    }

    /// Names of all stored wallets, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LabError::Wallet("Wallet name cannot be empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(LabError::Wallet(format!(
            "Wallet name too long (max {} characters)",
            MAX_NAME_LENGTH
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LabError::Wallet(format!(
            "Wallet name '{}' may only contain letters, digits, '-' and '_'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PHRASE: &str = "spoil danger stomach boring champion arch cherry father kit shiver wife dragon";

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path());

        let mut wallet = HdWallet::from_phrase(PHRASE, Network::Testnet).unwrap();
        let first = wallet.new_receiving_address().unwrap();
        let file = WalletFile::from_wallet("alice", &wallet).unwrap();
        store.create(&file).unwrap();

        let loaded = store.load_named("alice").unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.next_receive, 1);

        let reopened = loaded.open().unwrap();
        assert_eq!(reopened.cursors(), (1, 0));
        assert_eq!(reopened.privkey(&first.address).unwrap(), first.private_key);
    }

    #[test]
    fn test_open_rejects_hardened_cursor() {
        let wallet = HdWallet::from_phrase(PHRASE, Network::Testnet).unwrap();
        let mut file = WalletFile::from_wallet("carol", &wallet).unwrap();
        file.next_receive = u32::MAX;
        assert!(matches!(file.open(), Err(LabError::Wallet(_))));

        file.next_receive = MAX_ADDRESS_INDEX - 1;
        assert!(file.open().is_ok());
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path());
        let wallet = HdWallet::from_phrase(PHRASE, Network::Testnet).unwrap();
        let file = WalletFile::from_wallet("bob", &wallet).unwrap();

        store.create(&file).unwrap();
        assert!(store.create(&file).is_err());
        // store() is the explicit overwrite path
        assert!(store.store(&file).is_ok());
    }

    #[test]
    fn test_update_cursors() {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path());
        let mut wallet = HdWallet::from_phrase(PHRASE, Network::Testnet).unwrap();
        let mut file = WalletFile::from_wallet(DEFAULT_WALLET_NAME, &wallet).unwrap();
        store.create(&file).unwrap();

        wallet.new_change_address().unwrap();
        wallet.new_change_address().unwrap();
        file.update_from(&wallet);
        store.store(&file).unwrap();

        let loaded = store.load_default().unwrap();
        assert_eq!(loaded.next_change, 2);
        assert!(!dir.path().join("default.tmp").exists());
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path());
        let wallet = HdWallet::from_phrase(PHRASE, Network::Testnet).unwrap();

        for name in ["zed", "amy"] {
            store.create(&WalletFile::from_wallet(name, &wallet).unwrap()).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        assert_eq!(store.list().unwrap(), vec!["amy".to_string(), "zed".to_string()]);
    }

    #[test]
    fn test_list_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path().join("nowhere"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_wallet() {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path());
        let err = store.load_named("ghost").unwrap_err();
        assert!(err.to_string().contains("No wallet named"));
    }

    #[test]
    fn test_invalid_names() {
        let wallet = HdWallet::from_phrase(PHRASE, Network::Testnet).unwrap();
        assert!(WalletFile::from_wallet("", &wallet).is_err());
        assert!(WalletFile::from_wallet("../escape", &wallet).is_err());
        assert!(WalletFile::from_wallet(&"x".repeat(65), &wallet).is_err());
    }
}
