//! In-process contract state machines
//!
//! Contracts run against an [`Env`] that plays the role of the chain: it
//! knows who is calling, how much value rides along with the call, account
//! balances and nonces, and it collects emitted events. A failed check
//! returns [`Revert`] before any state is touched, so a reverted call leaves
//! both the contract and the environment as they were.

pub mod accounts;
pub mod counter;
pub mod message_wall;
pub mod personal_wallet;
pub mod user_registration;
pub mod votation;

pub use accounts::{dev_accounts, get_account, DevAccounts, DEV_MNEMONIC};
pub use counter::SimpleCounter;
pub use message_wall::{MessageWall, UserDirectory};
pub use personal_wallet::PersonalWallet;
pub use user_registration::UserRegistration;
pub use votation::{Candidate, VotationSystem};

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use thiserror::Error;
use tracing::trace;

/// A call that failed a `require` check. Carries the revert reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("execution reverted: {0}")]
pub struct Revert(String);

impl Revert {
    pub fn new(reason: impl Into<String>) -> Self {
        Revert(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

pub type CallResult<T> = std::result::Result<T, Revert>;

/// Returns `Err(Revert(reason))` unless `condition` holds.
pub(crate) fn require(condition: bool, reason: &str) -> CallResult<()> {
    if condition {
        Ok(())
    } else {
        Err(Revert::new(reason))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NewValue { sender: Address, new_number: U256 },
    VotationFinished { winner: i32 },
    CoinReceived { sender: Address, amount: U256 },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::NewValue { .. } => "NewValue",
            Event::VotationFinished { .. } => "VotationFinished",
            Event::CoinReceived { .. } => "CoinReceived",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub contract: Address,
    pub event: Event,
}

#[derive(Debug, Default)]
pub struct Env {
    caller: Address,
    value: U256,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    logs: Vec<LogEntry>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment whose default caller is `caller`.
    pub fn with_caller(caller: Address) -> Self {
        Env {
            caller,
            ..Self::default()
        }
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Sets the caller for the following calls and clears any transferred value.
    pub fn set_caller(&mut self, caller: Address) -> &mut Self {
        self.caller = caller;
        self.value = U256::ZERO;
        self
    }

    /// Shorthand for `set_caller` when chaining into a contract call.
    pub fn from(&mut self, caller: Address) -> &mut Self {
        self.set_caller(caller)
    }

    pub fn transferred_value(&self) -> U256 {
        self.value
    }

    pub fn set_value_transferred(&mut self, value: U256) -> &mut Self {
        self.value = value;
        self
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or(U256::ZERO)
    }

    pub fn set_balance(&mut self, account: Address, balance: U256) {
        self.balances.insert(account, balance);
    }

    pub fn nonce_of(&self, account: &Address) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0)
    }

    /// Address a contract created by `deployer` gets, advancing the deployer's nonce.
    pub(crate) fn next_contract_address(&mut self, deployer: Address) -> Address {
        let nonce = self.nonces.entry(deployer).or_insert(0);
        let address = deployer.create(*nonce);
        *nonce += 1;
        trace!("Contract created at {} by {}", address, deployer);
        address
    }

    /// Moves `amount` between accounts.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> CallResult<()> {
        let available = self.balance_of(&from);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| Revert::new("Insufficient balance for transfer"))?;
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| Revert::new("Balance overflow"))?;

        self.balances.insert(from, remaining);
        self.balances.insert(to, credited);
        Ok(())
    }

    pub(crate) fn emit(&mut self, contract: Address, event: Event) {
        trace!("{} emitted {:?}", contract, event);
        self.logs.push(LogEntry { contract, event });
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn last_event(&self) -> Option<&Event> {
        self.logs.last().map(|entry| &entry.event)
    }

    /// Events named `name`, oldest first.
    pub fn events_named(&self, name: &str) -> Vec<&Event> {
        self.logs
            .iter()
            .map(|entry| &entry.event)
            .filter(|event| event.name() == name)
            .collect()
    }

    pub fn clear_logs(&mut self) {
        self.logs.clear();
    }
}
