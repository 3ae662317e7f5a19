//! Key handling shared by the Bitcoin and Ethereum exercises

use crate::error::{LabError, Result};
use alloy::primitives::{keccak256, Address};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{constants::SECRET_KEY_SIZE, All, PublicKey, Secp256k1, SecretKey};
use std::str::FromStr;

/// A thread-safe, lazily initialized Secp256k1 context.
pub static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Number of hex characters in a raw private key.
pub const SECRET_KEY_HEX_LEN: usize = SECRET_KEY_SIZE * 2;

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Parses a private key typed by a user: exactly 64 hex characters,
    /// optionally prefixed with `0x`.
    pub fn from_secret_hex(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        if hex_part.len() != SECRET_KEY_HEX_LEN {
            return Err(LabError::Crypto(format!(
                "Private key must be {} hex characters, got {}",
                SECRET_KEY_HEX_LEN,
                hex_part.len()
            )));
        }

        let bytes = hex::decode(hex_part)
            .map_err(|e| LabError::Crypto(format!("Private key is not valid hex: {}", e)))?;
        let secret_key = SecretKey::from_slice(&bytes)
            .map_err(|e| LabError::Crypto(format!("Invalid secret key bytes: {}", e)))?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Ethereum address: last 20 bytes of keccak-256 over the uncompressed
    /// public key without its 0x04 prefix.
    pub fn eth_address(&self) -> Address {
        let uncompressed = self.public_key.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        Address::from_slice(&hash[12..])
    }

    /// The secret key as 64 lowercase hex characters.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }
}

/// Validates an Ethereum address the way wallet tooling does: all-lowercase
/// or all-uppercase hex is accepted as is, mixed case must carry a valid
/// EIP-55 checksum.
pub fn parse_eth_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| LabError::InvalidAddress(format!("'{}' is missing the 0x prefix", trimmed)))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LabError::InvalidAddress(format!(
            "'{}' is not 20 bytes of hex",
            trimmed
        )));
    }

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        let normalized = format!("0x{}", hex_part);
        Address::parse_checksummed(&normalized, None)
            .map_err(|_| LabError::InvalidAddress(format!("'{}' has an invalid checksum", trimmed)))
    } else {
        Address::from_str(hex_part)
            .map_err(|e| LabError::InvalidAddress(format!("'{}': {}", trimmed, e)))
    }
}

/// EIP-55 checksummed form of an address.
pub fn to_checksum(address: &Address) -> String {
    address.to_checksum(None)
}
