//! HD wallet (BIP-39 mnemonic, BIP-44 derivation) for the Bitcoin test network
//!
//! A wallet is a mnemonic plus an account path (`m/44'/1'/0'` by default).
//! Receiving addresses live on the external chain (`/0/i`), change addresses
//! on the internal chain (`/1/i`). Addresses are legacy P2PKH.

use crate::crypto::SECP256K1_CONTEXT;
use crate::error::{LabError, Result};
use bip39::Mnemonic;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv, Xpub};
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network, PrivateKey, PublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_ACCOUNT_PATH: &str = "m/44'/1'/0'";

/// 16 bytes of entropy give a 12-word phrase.
pub const ENTROPY_BYTES: usize = 16;

/// How far past the last handed-out index `privkey` searches.
pub const GAP_LIMIT: u32 = 20;

/// First hardened child index; address indices stay below it.
pub const MAX_ADDRESS_INDEX: u32 = 1 << 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChain {
    Receiving,
    Change,
}

impl KeyChain {
    fn child(self) -> ChildNumber {
        match self {
            KeyChain::Receiving => ChildNumber::Normal { index: 0 },
            KeyChain::Change => ChildNumber::Normal { index: 1 },
        }
    }
}

impl fmt::Display for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KeyChain::Receiving => write!(f, "receiving"),
            KeyChain::Change => write!(f, "change"),
        }
    }
}

/// One derived key with its address.
#[derive(Debug, Clone)]
pub struct DerivedAddress {
    pub chain: KeyChain,
    pub index: u32,
    pub path: DerivationPath,
    pub address: Address,
    pub private_key: PrivateKey,
}

impl DerivedAddress {
    pub fn wif(&self) -> String {
        self.private_key.to_wif()
    }

    /// Full derivation path including the `m/` root.
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

#[derive(Debug, Clone)]
pub struct HdWallet {
    mnemonic: Mnemonic,
    network: Network,
    account_path: DerivationPath,
    account_xprv: Xpriv,
    next_receive: u32,
    next_change: u32,
}

impl HdWallet {
    /// Creates a wallet from fresh OS entropy.
    pub fn generate(network: Network) -> Result<Self> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        OsRng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)?;
        Self::from_mnemonic(mnemonic, network, DEFAULT_ACCOUNT_PATH)
    }

    /// Restores a wallet from its seed words. Extra whitespace and letter
    /// case are ignored.
    pub fn from_phrase(phrase: &str, network: Network) -> Result<Self> {
        Self::from_phrase_with_path(phrase, network, DEFAULT_ACCOUNT_PATH)
    }

    pub fn from_phrase_with_path(phrase: &str, network: Network, account_path: &str) -> Result<Self> {
        let normalized = normalize_phrase(phrase);
        if normalized.is_empty() {
            return Err(LabError::Wallet("Seed phrase is empty".to_string()));
        }
        let mnemonic = Mnemonic::parse_normalized(&normalized)?;
        Self::from_mnemonic(mnemonic, network, account_path)
    }

    fn from_mnemonic(mnemonic: Mnemonic, network: Network, account_path: &str) -> Result<Self> {
        let account_path = DerivationPath::from_str(account_path).map_err(|e| {
            LabError::Wallet(format!("Invalid derivation path '{}': {}", account_path, e))
        })?;

        let seed = mnemonic.to_seed("");
        let master = Xpriv::new_master(network, &seed)?;
        let account_xprv = master.derive_priv(&SECP256K1_CONTEXT, &account_path)?;

        debug!("Wallet ready at {} on {}", account_path, network);

        Ok(HdWallet {
            mnemonic,
            network,
            account_path,
            account_xprv,
            next_receive: 0,
            next_change: 0,
        })
    }

    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// The account-level derivation path, e.g. `m/44'/1'/0'`.
    pub fn root_derivation(&self) -> String {
        format_path(&self.account_path)
    }

    /// Account extended private key (`tprv...` on test networks).
    pub fn xprv(&self) -> String {
        self.account_xprv.to_string()
    }

    /// Account extended public key (`tpub...` on test networks).
    pub fn xpub(&self) -> String {
        Xpub::from_priv(&SECP256K1_CONTEXT, &self.account_xprv).to_string()
    }

    /// Indices the next `new_*_address` calls will hand out.
    pub fn cursors(&self) -> (u32, u32) {
        (self.next_receive, self.next_change)
    }

    pub fn set_cursors(&mut self, next_receive: u32, next_change: u32) {
        self.next_receive = next_receive;
        self.next_change = next_change;
    }

    /// Derives the key at `chain/index` below the account path.
    pub fn derive(&self, chain: KeyChain, index: u32) -> Result<DerivedAddress> {
        let child = ChildNumber::from_normal_idx(index)?;
        let relative = DerivationPath::from(vec![chain.child(), child]);
        let xprv = self.account_xprv.derive_priv(&SECP256K1_CONTEXT, &relative)?;

        let private_key = xprv.to_priv();
        let public_key = PublicKey::from_private_key(&SECP256K1_CONTEXT, &private_key);
        let address = Address::p2pkh(public_key.pubkey_hash(), self.network);

        Ok(DerivedAddress {
            chain,
            index,
            path: self.account_path.extend(&relative),
            address,
            private_key,
        })
    }

    /// Hands out the next receiving address.
    pub fn new_receiving_address(&mut self) -> Result<DerivedAddress> {
        let derived = self.derive(KeyChain::Receiving, self.next_receive)?;
        self.next_receive += 1;
        Ok(derived)
    }

    /// Hands out the next change address.
    pub fn new_change_address(&mut self) -> Result<DerivedAddress> {
        let derived = self.derive(KeyChain::Change, self.next_change)?;
        self.next_change += 1;
        Ok(derived)
    }

    /// Finds the private key behind one of this wallet's addresses.
    pub fn privkey(&self, address: &Address) -> Result<PrivateKey> {
        self.find(address).map(|derived| derived.private_key)
    }

    /// Finds the derivation of one of this wallet's addresses, searching
    /// both chains up to the gap limit past the handed-out cursor.
    pub fn find(&self, address: &Address) -> Result<DerivedAddress> {
        for (chain, cursor) in [
            (KeyChain::Receiving, self.next_receive),
            (KeyChain::Change, self.next_change),
        ] {
            let end = cursor.saturating_add(GAP_LIMIT).min(MAX_ADDRESS_INDEX);
            for index in 0..end {
                let derived = self.derive(chain, index)?;
                if &derived.address == address {
                    return Ok(derived);
                }
            }
        }

        Err(LabError::Wallet(format!(
            "Address {} does not belong to this wallet",
            address
        )))
    }
}

fn format_path(path: &DerivationPath) -> String {
    if path.is_empty() {
        "m".to_string()
    } else {
        format!("m/{}", path)
    }
}

fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses an address string and checks it belongs to `network`.
pub fn parse_address(input: &str, network: Network) -> Result<Address> {
    let unchecked = Address::<NetworkUnchecked>::from_str(input.trim())
        .map_err(|e| LabError::InvalidAddress(format!("'{}': {}", input.trim(), e)))?;
    unchecked.require_network(network).map_err(|e| {
        LabError::InvalidAddress(format!("'{}' is not a {} address: {}", input.trim(), network, e))
    })
}
