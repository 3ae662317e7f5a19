//! chainlab - classroom blockchain exercises
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Bitcoin Testnet Wallet
//! - [`hdwallet`] - BIP-39 mnemonics and BIP-32/44 key derivation
//! - [`wallet`] - Wallet files on disk
//! - [`explorer`] - Esplora block explorer client
//! - [`transfer`] - Coin selection, P2PKH signing and broadcast
//!
//! ## Smart Contracts
//! - [`contracts`] - In-process SimpleCounter, VotationSystem and friends
//! - [`eth`] - JSON-RPC client and typed contract bindings
//! - [`scripts`] - Interaction, deploy and vote flows over either backend
//!
//! ## Cryptography
//! - [`crypto`] - secp256k1 key pairs and Ethereum addresses
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Bitcoin Testnet Wallet
// ============================================================================
pub mod explorer;
pub mod hdwallet;
pub mod transfer;
pub mod wallet;

// ============================================================================
// Smart Contracts
// ============================================================================
pub mod contracts;
pub mod eth;
pub mod scripts;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;

pub use error::{LabError, Result};
