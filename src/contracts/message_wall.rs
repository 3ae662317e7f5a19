//! Public message board open to registered users

use super::{require, CallResult, Env};
use alloy::primitives::Address;

pub const NOT_REGISTERED: &str = "Caller is not registered.";
pub const PAGE_SIZE: usize = 10;

/// Lookup the wall performs against the registration contract before
/// accepting a post.
pub trait UserDirectory {
    fn user_name(&self, account: Address) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Message {
    user_name: String,
    text: String,
}

#[derive(Debug, Clone)]
pub struct MessageWall {
    address: Address,
    user_contract: Address,
    messages: Vec<Message>,
}

impl MessageWall {
    /// Deploys a wall bound to the registration contract at `user_contract`,
    /// seeded with two welcome messages.
    pub fn deploy(env: &mut Env, user_contract: Address) -> Self {
        let deployer = env.caller();
        let seed = |text: &str| Message {
            user_name: "Admin".to_string(),
            text: text.to_string(),
        };
        MessageWall {
            address: env.next_contract_address(deployer),
            user_contract,
            messages: vec![
                seed("Welcome to the message wall!"),
                seed("Feel free to leave a message!"),
            ],
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn user_contract(&self) -> Address {
        self.user_contract
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn get_last_message(&self) -> String {
        match self.messages.len().checked_sub(1) {
            Some(index) => format_message(index, &self.messages[index]),
            None => "No messages available.".to_string(),
        }
    }

    /// Up to the ten most recent messages, oldest first.
    pub fn get_last_10_messages(&self) -> Vec<String> {
        let start = self.messages.len().saturating_sub(PAGE_SIZE);
        self.messages[start..]
            .iter()
            .enumerate()
            .map(|(offset, message)| format_message(start + offset, message))
            .collect()
    }

    pub fn post_message(
        &mut self,
        env: &mut Env,
        users: &dyn UserDirectory,
        user_name: &str,
        text: &str,
    ) -> CallResult<()> {
        require(users.user_name(env.caller()).is_some(), NOT_REGISTERED)?;
        self.messages.push(Message {
            user_name: user_name.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

fn format_message(index: usize, message: &Message) -> String {
    format!("Message #{}: {} - {}", index, message.user_name, message.text)
}
