//! Wallet contract that accepts deposits from anyone and pays out on the owner's order

use super::{require, CallResult, Env, Event, Revert};
use alloy::primitives::{Address, U256};

pub const NOT_OWNER: &str = "Caller is not owner";
pub const INSUFFICIENT_BALANCE: &str = "Insufficient balance";

#[derive(Debug, Clone)]
pub struct PersonalWallet {
    address: Address,
    owner: Address,
    balance: U256,
}

impl PersonalWallet {
    pub fn deploy(env: &mut Env) -> Self {
        let owner = env.caller();
        let address = env.next_contract_address(owner);
        PersonalWallet {
            address,
            owner,
            balance: U256::ZERO,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Payable: credits the value sent with the call.
    pub fn deposit(&mut self, env: &mut Env) -> CallResult<U256> {
        let sender = env.caller();
        let amount = env.transferred_value();
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| Revert::new("Balance overflow"))?;

        env.transfer(sender, self.address, amount)?;
        self.balance = balance;
        env.emit(self.address, Event::CoinReceived { sender, amount });
        Ok(balance)
    }

    pub fn send_coin(&mut self, env: &mut Env, to: Address, amount: U256) -> CallResult<()> {
        require(env.caller() == self.owner, NOT_OWNER)?;
        require(self.balance >= amount, INSUFFICIENT_BALANCE)?;

        env.transfer(self.address, to, amount)?;
        self.balance -= amount;
        Ok(())
    }

    pub fn get_balance(&self) -> U256 {
        self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);
    const CHARLIE: Address = Address::repeat_byte(0xc4);

    fn funded_env() -> Env {
        let mut env = Env::with_caller(ALICE);
        env.set_balance(ALICE, U256::from(9_000_000u64));
        env.set_balance(BOB, U256::from(1_000u64));
        env
    }

    #[test]
    fn test_new_wallet_is_empty() {
        let mut env = funded_env();
        let wallet = PersonalWallet::deploy(&mut env);
        assert_eq!(wallet.get_balance(), U256::ZERO);
    }

    #[test]
    fn test_deposit_from_owner() {
        let mut env = funded_env();
        let mut wallet = PersonalWallet::deploy(&mut env);

        env.set_value_transferred(U256::from(2_000_000u64));
        wallet.deposit(&mut env).unwrap();

        assert_eq!(wallet.get_balance(), U256::from(2_000_000u64));
        assert_eq!(env.balance_of(&ALICE), U256::from(7_000_000u64));
        assert_eq!(env.balance_of(&wallet.address()), U256::from(2_000_000u64));
        assert_eq!(
            env.last_event(),
            Some(&Event::CoinReceived {
                sender: ALICE,
                amount: U256::from(2_000_000u64)
            })
        );
    }

    #[test]
    fn test_anyone_can_deposit() {
        let mut env = funded_env();
        let mut wallet = PersonalWallet::deploy(&mut env);

        env.set_caller(BOB).set_value_transferred(U256::from(50u64));
        wallet.deposit(&mut env).unwrap();
        assert_eq!(wallet.get_balance(), U256::from(50u64));
    }

    #[test]
    fn test_deposit_beyond_caller_funds_reverts() {
        let mut env = funded_env();
        let mut wallet = PersonalWallet::deploy(&mut env);

        env.set_caller(BOB).set_value_transferred(U256::from(5_000u64));
        assert!(wallet.deposit(&mut env).is_err());
        assert_eq!(wallet.get_balance(), U256::ZERO);
        assert!(env.logs().is_empty());
    }

    #[test]
    fn test_owner_sends_coin() {
        let mut env = funded_env();
        let mut wallet = PersonalWallet::deploy(&mut env);
        env.set_value_transferred(U256::from(100u64));
        wallet.deposit(&mut env).unwrap();

        wallet.send_coin(&mut env, CHARLIE, U256::from(50u64)).unwrap();
        assert_eq!(wallet.get_balance(), U256::from(50u64));
        assert_eq!(env.balance_of(&CHARLIE), U256::from(50u64));
    }

    #[test]
    fn test_non_owner_cannot_send() {
        let mut env = funded_env();
        let mut wallet = PersonalWallet::deploy(&mut env);
        env.set_value_transferred(U256::from(100u64));
        wallet.deposit(&mut env).unwrap();

        env.set_caller(BOB);
        let err = wallet.send_coin(&mut env, CHARLIE, U256::from(50u64)).unwrap_err();
        assert_eq!(err.reason(), NOT_OWNER);
        assert_eq!(wallet.get_balance(), U256::from(100u64));
    }

    #[test]
    fn test_send_more_than_balance() {
        let mut env = funded_env();
        let mut wallet = PersonalWallet::deploy(&mut env);
        env.set_value_transferred(U256::from(1_000u64));
        wallet.deposit(&mut env).unwrap();

        wallet.send_coin(&mut env, BOB, U256::from(500u64)).unwrap();
        let err = wallet.send_coin(&mut env, BOB, U256::from(2_000u64)).unwrap_err();
        assert_eq!(err.reason(), INSUFFICIENT_BALANCE);
        assert_eq!(wallet.get_balance(), U256::from(500u64));
    }
}
