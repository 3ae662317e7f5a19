//! Single-round vote among numbered candidates

use super::{require, CallResult, Env, Event, Revert};
use alloy::primitives::{Address, U256};
use std::collections::HashSet;

pub const NOT_OWNER: &str = "Caller is not owner";
pub const NOT_WHITELISTED: &str = "Caller is not on the white list";
pub const ALREADY_VOTED: &str = "Caller has voted already";
pub const FINISHED: &str = "Votation has finished already";

/// Winner reported when nobody received a vote.
pub const NO_WINNER: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub id: i32,
    pub votes: U256,
}

#[derive(Debug, Clone)]
pub struct VotationSystem {
    address: Address,
    owner: Address,
    candidates: Vec<Candidate>,
    whitelist: HashSet<Address>,
    has_voted: HashSet<Address>,
    votation_finished: bool,
    winner: i32,
}

impl VotationSystem {
    pub fn deploy(env: &mut Env) -> Self {
        let owner = env.caller();
        let address = env.next_contract_address(owner);
        VotationSystem {
            address,
            owner,
            candidates: Vec::new(),
            whitelist: HashSet::new(),
            has_voted: HashSet::new(),
            votation_finished: false,
            winner: NO_WINNER,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn add_candidate(&mut self, env: &mut Env, id: i32) -> CallResult<()> {
        self.ensure_owner(env)?;
        self.candidates.push(Candidate { id, votes: U256::ZERO });
        Ok(())
    }

    /// Whitelists `voter` and resets their voted flag.
    pub fn add_voter(&mut self, env: &mut Env, voter: Address) -> CallResult<()> {
        self.ensure_owner(env)?;
        self.whitelist.insert(voter);
        self.has_voted.remove(&voter);
        Ok(())
    }

    /// Casts the caller's vote. A vote for an id nobody registered is
    /// accepted but counts for nothing and does not use up the ballot.
    pub fn vote(&mut self, env: &mut Env, id: i32) -> CallResult<()> {
        let caller = env.caller();
        require(self.whitelist.contains(&caller), NOT_WHITELISTED)?;
        require(!self.has_voted.contains(&caller), ALREADY_VOTED)?;
        require(!self.votation_finished, FINISHED)?;

        if let Some(candidate) = self.candidates.iter_mut().find(|c| c.id == id) {
            candidate.votes = candidate
                .votes
                .checked_add(U256::from(1u64))
                .ok_or_else(|| Revert::new("Vote count overflow"))?;
            self.has_voted.insert(caller);
        }
        Ok(())
    }

    /// Closes the vote and records the winner: the first candidate holding
    /// the strictly highest count, or `NO_WINNER` when no votes were cast.
    pub fn finish_votation(&mut self, env: &mut Env) -> CallResult<i32> {
        self.ensure_owner(env)?;
        require(!self.votation_finished, FINISHED)?;

        let mut max_votes = U256::ZERO;
        let mut winner = NO_WINNER;
        for candidate in &self.candidates {
            if candidate.votes > max_votes {
                max_votes = candidate.votes;
                winner = candidate.id;
            }
        }

        self.winner = winner;
        self.votation_finished = true;
        env.emit(self.address, Event::VotationFinished { winner });
        Ok(winner)
    }

    pub fn candidates(&self, index: usize) -> CallResult<Candidate> {
        self.candidates
            .get(index)
            .copied()
            .ok_or_else(|| Revert::new("Candidate index out of bounds"))
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn whitelist(&self, account: Address) -> bool {
        self.whitelist.contains(&account)
    }

    pub fn has_voted(&self, account: Address) -> bool {
        self.has_voted.contains(&account)
    }

    pub fn votation_finished(&self) -> bool {
        self.votation_finished
    }

    pub fn winner(&self) -> i32 {
        self.winner
    }

    fn ensure_owner(&self, env: &Env) -> CallResult<()> {
        require(env.caller() == self.owner, NOT_OWNER)
    }
}
