//! One user name per account, one account per user name

use super::message_wall::UserDirectory;
use super::{require, CallResult, Env};
use alloy::primitives::Address;
use std::collections::HashMap;

pub const NAME_TAKEN: &str = "User exists already";
pub const ALREADY_REGISTERED: &str = "User already has a user name";

#[derive(Debug, Clone)]
pub struct UserRegistration {
    address: Address,
    users: HashMap<String, Address>,
    addresses: HashMap<Address, String>,
}

impl UserRegistration {
    pub fn deploy(env: &mut Env) -> Self {
        let deployer = env.caller();
        UserRegistration {
            address: env.next_contract_address(deployer),
            users: HashMap::new(),
            addresses: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn register_user(&mut self, env: &mut Env, user_name: &str) -> CallResult<()> {
        let caller = env.caller();
        require(!self.users.contains_key(user_name), NAME_TAKEN)?;
        require(!self.addresses.contains_key(&caller), ALREADY_REGISTERED)?;

        self.users.insert(user_name.to_string(), caller);
        self.addresses.insert(caller, user_name.to_string());
        Ok(())
    }

    pub fn get_user_name(&self, account: Address) -> Option<String> {
        self.addresses.get(&account).cloned()
    }
}

impl UserDirectory for UserRegistration {
    fn user_name(&self, account: Address) -> Option<String> {
        self.get_user_name(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);

    #[test]
    fn test_register_user() {
        let mut env = Env::with_caller(ALICE);
        let mut registry = UserRegistration::deploy(&mut env);
        registry.register_user(&mut env, "Alice").unwrap();
        assert_eq!(registry.get_user_name(ALICE), Some("Alice".to_string()));
    }

    #[test]
    fn test_name_taken() {
        let mut env = Env::with_caller(ALICE);
        let mut registry = UserRegistration::deploy(&mut env);
        registry.register_user(&mut env, "Alice").unwrap();

        env.set_caller(BOB);
        let err = registry.register_user(&mut env, "Alice").unwrap_err();
        assert_eq!(err.reason(), NAME_TAKEN);
        assert_eq!(registry.get_user_name(BOB), None);
    }

    #[test]
    fn test_second_name_for_same_account() {
        let mut env = Env::with_caller(ALICE);
        let mut registry = UserRegistration::deploy(&mut env);
        registry.register_user(&mut env, "Alice").unwrap();
        let err = registry.register_user(&mut env, "Alicia").unwrap_err();
        assert_eq!(err.reason(), ALREADY_REGISTERED);
    }

    #[test]
    fn test_unknown_account() {
        let mut env = Env::new();
        let registry = UserRegistration::deploy(&mut env);
        assert_eq!(registry.get_user_name(Address::repeat_byte(0x02)), None);
    }
}
