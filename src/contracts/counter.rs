//! Counter guarded by an owner-managed whitelist

use super::{require, CallResult, Env, Event};
use alloy::primitives::{Address, U256};
use std::collections::HashSet;

pub const NOT_OWNER: &str = "Caller is not owner";
pub const NOT_WHITELISTED: &str = "Caller is not in the white list";
pub const NEGATIVE_COUNTER: &str = "Counter cannot be negative";

#[derive(Debug, Clone)]
pub struct SimpleCounter {
    address: Address,
    owner: Address,
    number: U256,
    white_list: HashSet<Address>,
}

impl SimpleCounter {
    /// Deploys a counter from the current caller, who becomes the owner and
    /// the first whitelisted account.
    pub fn deploy(env: &mut Env) -> Self {
        let owner = env.caller();
        let address = env.next_contract_address(owner);
        SimpleCounter {
            address,
            owner,
            number: U256::ZERO,
            white_list: HashSet::from([owner]),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn retrieve_number(&self) -> U256 {
        self.number
    }

    pub fn white_list(&self, account: Address) -> bool {
        self.white_list.contains(&account)
    }

    pub fn increase_number(&mut self, env: &mut Env) -> CallResult<U256> {
        self.ensure_white_list(env)?;
        let next = self
            .number
            .checked_add(U256::from(1u64))
            .ok_or_else(|| super::Revert::new("Counter overflow"))?;
        self.set_number(env, next);
        Ok(next)
    }

    pub fn decrease_number(&mut self, env: &mut Env) -> CallResult<U256> {
        self.ensure_white_list(env)?;
        require(self.number > U256::ZERO, NEGATIVE_COUNTER)?;
        let next = self.number - U256::from(1u64);
        self.set_number(env, next);
        Ok(next)
    }

    pub fn add_to_white_list(&mut self, env: &mut Env, account: Address) -> CallResult<()> {
        self.ensure_owner(env)?;
        self.white_list.insert(account);
        Ok(())
    }

    pub fn remove_from_white_list(&mut self, env: &mut Env, account: Address) -> CallResult<()> {
        self.ensure_owner(env)?;
        self.white_list.remove(&account);
        Ok(())
    }

    fn set_number(&mut self, env: &mut Env, number: U256) {
        self.number = number;
        env.emit(
            self.address,
            Event::NewValue {
                sender: env.caller(),
                new_number: number,
            },
        );
    }

    fn ensure_owner(&self, env: &Env) -> CallResult<()> {
        require(env.caller() == self.owner, NOT_OWNER)
    }

    fn ensure_white_list(&self, env: &Env) -> CallResult<()> {
        require(self.white_list.contains(&env.caller()), NOT_WHITELISTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);
    const EVE: Address = Address::repeat_byte(0xee);

    fn deployed() -> (Env, SimpleCounter) {
        let mut env = Env::with_caller(ALICE);
        let counter = SimpleCounter::deploy(&mut env);
        (env, counter)
    }

    #[test]
    fn test_starts_at_zero_with_owner_whitelisted() {
        let (_, counter) = deployed();
        assert_eq!(counter.retrieve_number(), U256::ZERO);
        assert_eq!(counter.owner(), ALICE);
        assert!(counter.white_list(ALICE));
        assert!(!counter.white_list(BOB));
    }

    #[test]
    fn test_owner_manages_whitelist() {
        let (mut env, mut counter) = deployed();
        counter.add_to_white_list(&mut env, BOB).unwrap();
        assert!(counter.white_list(BOB));
        counter.remove_from_white_list(&mut env, BOB).unwrap();
        assert!(!counter.white_list(BOB));
    }

    #[test]
    fn test_non_owner_cannot_touch_whitelist() {
        let (mut env, mut counter) = deployed();
        counter.add_to_white_list(&mut env, EVE).unwrap();

        env.set_caller(BOB);
        let err = counter.add_to_white_list(&mut env, BOB).unwrap_err();
        assert_eq!(err.reason(), NOT_OWNER);
        let err = counter.remove_from_white_list(&mut env, EVE).unwrap_err();
        assert_eq!(err.reason(), NOT_OWNER);
        assert!(counter.white_list(EVE));
    }

    #[test]
    fn test_increase_then_decrease() {
        let (mut env, mut counter) = deployed();
        assert_eq!(counter.increase_number(&mut env).unwrap(), U256::from(1u64));
        assert_eq!(counter.decrease_number(&mut env).unwrap(), U256::ZERO);
        assert_eq!(env.events_named("NewValue").len(), 2);
    }

    #[test]
    fn test_decrease_at_zero_reverts_without_event() {
        let (mut env, mut counter) = deployed();
        let err = counter.decrease_number(&mut env).unwrap_err();
        assert_eq!(err.reason(), NEGATIVE_COUNTER);
        assert!(env.logs().is_empty());
    }

    #[test]
    fn test_outsider_cannot_count() {
        let (mut env, mut counter) = deployed();
        env.set_caller(BOB);
        assert_eq!(counter.increase_number(&mut env).unwrap_err().reason(), NOT_WHITELISTED);
        assert_eq!(counter.decrease_number(&mut env).unwrap_err().reason(), NOT_WHITELISTED);
        assert_eq!(counter.retrieve_number(), U256::ZERO);
    }

    #[test]
    fn test_event_carries_sender() {
        let (mut env, mut counter) = deployed();
        counter.add_to_white_list(&mut env, BOB).unwrap();
        env.set_caller(BOB);
        counter.increase_number(&mut env).unwrap();

        assert_eq!(
            env.last_event(),
            Some(&Event::NewValue {
                sender: BOB,
                new_number: U256::from(1u64)
            })
        );
        assert_eq!(env.logs()[0].contract, counter.address());
    }
}
