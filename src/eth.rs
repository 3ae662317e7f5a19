//! Contract access over Ethereum JSON-RPC
//!
//! [`client::EthClient`] owns the provider and the transaction settings
//! (nonce, gas limit, gas price, confirmations). The remote contract
//! wrappers build calls from the ABI bindings and hand them to the client
//! for signing and broadcast.

pub mod artifact;
pub mod bindings;
pub mod client;
pub mod counter;
pub mod votation;

pub use artifact::{load_artifact, parse_artifact};
pub use client::{EthClient, TxSettings};
pub use counter::RemoteCounter;
pub use votation::RemoteVotation;
