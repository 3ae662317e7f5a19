//! SimpleCounter deployed on a live network

use super::bindings::SimpleCounter::SimpleCounterInstance;
use super::client::{contract_error, EthClient};
use crate::error::Result;
use crate::scripts::{CounterApi, TxOutcome};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct RemoteCounter {
    client: EthClient,
    contract: SimpleCounterInstance<DynProvider>,
    reader: Option<Address>,
}

impl RemoteCounter {
    pub fn new(client: EthClient, address: Address) -> Self {
        let contract = client.counter_at(address);
        RemoteCounter {
            client,
            contract,
            reader: None,
        }
    }

    /// Deploys fresh creation bytecode and binds to the new instance.
    pub async fn deploy(client: EthClient, bytecode: Bytes) -> Result<Self> {
        let (address, _) = client.deploy(bytecode, "SimpleCounter").await?;
        Ok(Self::new(client, address))
    }

    /// Account that view calls are made from. Defaults to the signer.
    pub fn with_reader(mut self, reader: Address) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn client(&self) -> &EthClient {
        &self.client
    }

    fn read_from(&self) -> Option<Address> {
        self.reader.or(self.client.sender())
    }
}

#[async_trait]
impl CounterApi for RemoteCounter {
    fn address(&self) -> Address {
        *self.contract.address()
    }

    fn caller(&self) -> Option<Address> {
        self.client.sender()
    }

    async fn retrieve_number(&self) -> Result<U256> {
        let mut call = self.contract.retrieveNumber();
        if let Some(from) = self.read_from() {
            call = call.from(from);
        }
        call.call().await.map_err(contract_error)
    }

    async fn white_list(&self, account: Address) -> Result<bool> {
        self.contract
            .whiteList(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn increase_number(&self) -> Result<TxOutcome> {
        self.client
            .submit(self.contract.increaseNumber(), "increaseNumber")
            .await
    }

    async fn decrease_number(&self) -> Result<TxOutcome> {
        self.client
            .submit(self.contract.decreaseNumber(), "decreaseNumber")
            .await
    }

    async fn add_to_white_list(&self, account: Address) -> Result<TxOutcome> {
        self.client
            .submit(self.contract.addToWhiteList(account), "addToWhiteList")
            .await
    }

    async fn remove_from_white_list(&self, account: Address) -> Result<TxOutcome> {
        self.client
            .submit(self.contract.removeFromWhiteList(account), "removeFromWhiteList")
            .await
    }
}
