//! Contract scripts that run the same way against a live node or in process
//!
//! [`CounterApi`] and [`VotationApi`] are implemented by the remote wrappers
//! in [`crate::eth`] and by the local ones here, which drive the contract
//! state machines of [`crate::contracts`] on a shared [`LocalChain`].

use crate::contracts::{
    Candidate, CallResult, Env, Event, LogEntry, SimpleCounter, VotationSystem,
};
use crate::crypto::KeyPair;
use crate::error::{LabError, Result};
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// What a state-changing call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    /// `None` for calls executed in process.
    pub tx_hash: Option<TxHash>,
    /// Whether the effects are known to be final. Remote calls sent
    /// without waiting are not.
    pub confirmed: bool,
    pub events: Vec<Event>,
}

impl TxOutcome {
    pub fn pending(tx_hash: TxHash) -> Self {
        TxOutcome {
            tx_hash: Some(tx_hash),
            confirmed: false,
            events: Vec::new(),
        }
    }

    pub fn confirmed(tx_hash: TxHash, events: Vec<Event>) -> Self {
        TxOutcome {
            tx_hash: Some(tx_hash),
            confirmed: true,
            events,
        }
    }

    pub fn local(events: Vec<Event>) -> Self {
        TxOutcome {
            tx_hash: None,
            confirmed: true,
            events,
        }
    }

    /// Value carried by the last `NewValue` event.
    pub fn new_number(&self) -> Option<U256> {
        self.events.iter().rev().find_map(|event| match event {
            Event::NewValue { new_number, .. } => Some(*new_number),
            _ => None,
        })
    }

    /// Winner carried by a `VotationFinished` event.
    pub fn winner(&self) -> Option<i32> {
        self.events.iter().find_map(|event| match event {
            Event::VotationFinished { winner } => Some(*winner),
            _ => None,
        })
    }
}

impl fmt::Display for TxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.tx_hash {
            Some(hash) => write!(f, "{}", hash),
            None => write!(f, "(in process)"),
        }
    }
}

#[async_trait]
pub trait CounterApi: Send + Sync {
    fn address(&self) -> Address;
    /// Account mutating calls are sent from, if any.
    fn caller(&self) -> Option<Address>;
    async fn retrieve_number(&self) -> Result<U256>;
    async fn white_list(&self, account: Address) -> Result<bool>;
    async fn increase_number(&self) -> Result<TxOutcome>;
    async fn decrease_number(&self) -> Result<TxOutcome>;
    async fn add_to_white_list(&self, account: Address) -> Result<TxOutcome>;
    async fn remove_from_white_list(&self, account: Address) -> Result<TxOutcome>;
}

#[async_trait]
pub trait VotationApi: Send + Sync {
    fn address(&self) -> Address;
    fn caller(&self) -> Option<Address>;
    /// The same contract, with calls sent by `key`.
    async fn as_caller(&self, key: &KeyPair) -> Result<Box<dyn VotationApi>>;
    async fn add_candidate(&self, id: i32) -> Result<TxOutcome>;
    async fn add_voter(&self, voter: Address) -> Result<TxOutcome>;
    async fn vote(&self, id: i32) -> Result<TxOutcome>;
    async fn finish_votation(&self) -> Result<TxOutcome>;
    async fn candidate(&self, index: u64) -> Result<Candidate>;
    async fn whitelist(&self, account: Address) -> Result<bool>;
    async fn votation_finished(&self) -> Result<bool>;
    async fn winner(&self) -> Result<i32>;
}

/// In-process chain shared by every local contract deployed on it.
#[derive(Debug, Clone, Default)]
pub struct LocalChain {
    env: Arc<Mutex<Env>>,
}

impl LocalChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&self, account: Address, amount: U256) {
        self.env.lock().set_balance(account, amount);
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.env.lock().balance_of(account)
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.env.lock().logs().to_vec()
    }

    pub fn deploy_counter(&self, owner: Address) -> LocalCounter {
        let contract = SimpleCounter::deploy(self.env.lock().set_caller(owner));
        info!("SimpleCounter deployed in process at {}", contract.address());
        LocalCounter {
            chain: self.clone(),
            contract: Arc::new(Mutex::new(contract)),
            caller: owner,
        }
    }

    pub fn deploy_votation(&self, owner: Address) -> LocalVotation {
        let contract = VotationSystem::deploy(self.env.lock().set_caller(owner));
        info!("VotationSystem deployed in process at {}", contract.address());
        LocalVotation {
            chain: self.clone(),
            contract: Arc::new(Mutex::new(contract)),
            caller: owner,
        }
    }

    /// Runs `call` as `caller` and collects the events it emitted.
    pub fn execute<T>(
        &self,
        caller: Address,
        call: impl FnOnce(&mut Env) -> CallResult<T>,
    ) -> Result<(T, Vec<Event>)> {
        let mut env = self.env.lock();
        env.set_caller(caller);
        let mark = env.logs().len();

        let value = call(&mut *env).map_err(LabError::from)?;
        let events = env.logs()[mark..]
            .iter()
            .map(|entry| entry.event.clone())
            .collect();
        Ok((value, events))
    }
}

#[derive(Debug, Clone)]
pub struct LocalCounter {
    chain: LocalChain,
    contract: Arc<Mutex<SimpleCounter>>,
    caller: Address,
}

impl LocalCounter {
    /// Same contract, different sender.
    pub fn connect_as(&self, caller: Address) -> Self {
        LocalCounter {
            caller,
            ..self.clone()
        }
    }

    fn transact(&self, call: impl FnOnce(&mut SimpleCounter, &mut Env) -> CallResult<()>) -> Result<TxOutcome> {
        let mut contract = self.contract.lock();
        let ((), events) = self.chain.execute(self.caller, |env| call(&mut *contract, env))?;
        Ok(TxOutcome::local(events))
    }
}

#[async_trait]
impl CounterApi for LocalCounter {
    fn address(&self) -> Address {
        self.contract.lock().address()
    }

    fn caller(&self) -> Option<Address> {
        Some(self.caller)
    }

    async fn retrieve_number(&self) -> Result<U256> {
        Ok(self.contract.lock().retrieve_number())
    }

    async fn white_list(&self, account: Address) -> Result<bool> {
        Ok(self.contract.lock().white_list(account))
    }

    async fn increase_number(&self) -> Result<TxOutcome> {
        self.transact(|counter, env| counter.increase_number(env).map(|_| ()))
    }

    async fn decrease_number(&self) -> Result<TxOutcome> {
        self.transact(|counter, env| counter.decrease_number(env).map(|_| ()))
    }

    async fn add_to_white_list(&self, account: Address) -> Result<TxOutcome> {
        self.transact(|counter, env| counter.add_to_white_list(env, account))
    }

    async fn remove_from_white_list(&self, account: Address) -> Result<TxOutcome> {
        self.transact(|counter, env| counter.remove_from_white_list(env, account))
    }
}

#[derive(Debug, Clone)]
pub struct LocalVotation {
    chain: LocalChain,
    contract: Arc<Mutex<VotationSystem>>,
    caller: Address,
}

impl LocalVotation {
    pub fn connect_as(&self, caller: Address) -> Self {
        LocalVotation {
            caller,
            ..self.clone()
        }
    }

    fn transact<T>(&self, call: impl FnOnce(&mut VotationSystem, &mut Env) -> CallResult<T>) -> Result<TxOutcome> {
        let mut contract = self.contract.lock();
        let (_, events) = self.chain.execute(self.caller, |env| call(&mut *contract, env))?;
        Ok(TxOutcome::local(events))
    }
}

#[async_trait]
impl VotationApi for LocalVotation {
    fn address(&self) -> Address {
        self.contract.lock().address()
    }

    fn caller(&self) -> Option<Address> {
        Some(self.caller)
    }

    async fn as_caller(&self, key: &KeyPair) -> Result<Box<dyn VotationApi>> {
        Ok(Box::new(self.connect_as(key.eth_address())))
    }

    async fn add_candidate(&self, id: i32) -> Result<TxOutcome> {
        self.transact(|votation, env| votation.add_candidate(env, id))
    }

    async fn add_voter(&self, voter: Address) -> Result<TxOutcome> {
        self.transact(|votation, env| votation.add_voter(env, voter))
    }

    async fn vote(&self, id: i32) -> Result<TxOutcome> {
        self.transact(|votation, env| votation.vote(env, id))
    }

    async fn finish_votation(&self) -> Result<TxOutcome> {
        self.transact(|votation, env| votation.finish_votation(env))
    }

    async fn candidate(&self, index: u64) -> Result<Candidate> {
        let index = usize::try_from(index)
            .map_err(|_| LabError::Reverted("Candidate index out of bounds".to_string()))?;
        Ok(self.contract.lock().candidates(index)?)
    }

    async fn whitelist(&self, account: Address) -> Result<bool> {
        Ok(self.contract.lock().whitelist(account))
    }

    async fn votation_finished(&self) -> Result<bool> {
        Ok(self.contract.lock().votation_finished())
    }

    async fn winner(&self) -> Result<i32> {
        Ok(self.contract.lock().winner())
    }
}

/// Result of reading the counter and bumping it once.
#[derive(Debug, Clone)]
pub struct CounterRun {
    pub before: U256,
    pub outcome: TxOutcome,
    /// Read back after the transaction; only present when it was confirmed.
    pub after: Option<U256>,
}

/// Reads the current number and sends one `increaseNumber`.
pub async fn counter_interaction(counter: &dyn CounterApi) -> Result<CounterRun> {
    let before = counter.retrieve_number().await?;
    info!("Current number on {}: {}", counter.address(), before);

    let outcome = counter.increase_number().await?;
    info!("increaseNumber transaction: {}", outcome);

    Ok(CounterRun {
        before,
        outcome,
        after: None,
    })
}

/// The post-deploy check: print, increase, wait, print again.
pub async fn counter_deploy_demo(counter: &dyn CounterApi) -> Result<CounterRun> {
    let mut run = counter_interaction(counter).await?;
    if run.outcome.confirmed {
        let after = counter.retrieve_number().await?;
        debug!("Number after confirmation: {}", after);
        run.after = Some(after);
    }
    Ok(run)
}

/// Summary of a completed vote.
#[derive(Debug, Clone)]
pub struct VotationReport {
    pub candidates: Vec<Candidate>,
    pub winner: i32,
    pub finish: TxOutcome,
}

/// Registers `candidate_ids` and `voters`, casts `ballots` as
/// `(voter index, candidate id)` pairs, closes the vote and reads back the
/// tallies.
pub async fn votation_demo(
    owner: &dyn VotationApi,
    candidate_ids: &[i32],
    voters: &[KeyPair],
    ballots: &[(usize, i32)],
) -> Result<VotationReport> {
    for id in candidate_ids {
        owner.add_candidate(*id).await?;
    }
    for voter in voters {
        owner.add_voter(voter.eth_address()).await?;
    }
    info!(
        "Registered {} candidate(s) and {} voter(s)",
        candidate_ids.len(),
        voters.len()
    );

    for (voter_index, candidate_id) in ballots {
        let voter = voters.get(*voter_index).ok_or_else(|| {
            LabError::Config(format!("Ballot refers to unknown voter #{}", voter_index))
        })?;
        owner.as_caller(voter).await?.vote(*candidate_id).await?;
        debug!("Voter {} voted for {}", voter.eth_address(), candidate_id);
    }

    let finish = owner.finish_votation().await?;
    let winner = match finish.winner() {
        Some(winner) => winner,
        None => owner.winner().await?,
    };

    let mut candidates = Vec::with_capacity(candidate_ids.len());
    for index in 0..candidate_ids.len() as u64 {
        candidates.push(owner.candidate(index).await?);
    }

    info!("Votation finished, winner: {}", winner);
    Ok(VotationReport {
        candidates,
        winner,
        finish,
    })
}
