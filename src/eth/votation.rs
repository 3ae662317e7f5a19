//! VotationSystem deployed on a live network

use super::bindings::VotationSystem::VotationSystemInstance;
use super::client::{contract_error, EthClient};
use crate::contracts::Candidate;
use crate::crypto::KeyPair;
use crate::error::Result;
use crate::scripts::{TxOutcome, VotationApi};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct RemoteVotation {
    client: EthClient,
    contract: VotationSystemInstance<DynProvider>,
}

impl RemoteVotation {
    pub fn new(client: EthClient, address: Address) -> Self {
        let contract = client.votation_at(address);
        RemoteVotation { client, contract }
    }

    pub async fn deploy(client: EthClient, bytecode: Bytes) -> Result<Self> {
        let (address, _) = client.deploy(bytecode, "VotationSystem").await?;
        Ok(Self::new(client, address))
    }

    pub fn client(&self) -> &EthClient {
        &self.client
    }
}

#[async_trait]
impl VotationApi for RemoteVotation {
    fn address(&self) -> Address {
        *self.contract.address()
    }

    fn caller(&self) -> Option<Address> {
        self.client.sender()
    }

    async fn as_caller(&self, key: &KeyPair) -> Result<Box<dyn VotationApi>> {
        let client = self.client.as_signer(key).await?;
        Ok(Box::new(RemoteVotation::new(client, self.address())))
    }

    async fn add_candidate(&self, id: i32) -> Result<TxOutcome> {
        self.client
            .submit(self.contract.addCandidate(id), "addCandidate")
            .await
    }

    async fn add_voter(&self, voter: Address) -> Result<TxOutcome> {
        self.client
            .submit(self.contract.addVoter(voter), "addVoter")
            .await
    }

    async fn vote(&self, id: i32) -> Result<TxOutcome> {
        self.client.submit(self.contract.vote(id), "vote").await
    }

    async fn finish_votation(&self) -> Result<TxOutcome> {
        self.client
            .submit(self.contract.finishVotation(), "finishVotation")
            .await
    }

    async fn candidate(&self, index: u64) -> Result<Candidate> {
        let candidate = self
            .contract
            .candidates(U256::from(index))
            .call()
            .await
            .map_err(contract_error)?;
        Ok(Candidate {
            id: candidate.id,
            votes: candidate.votes,
        })
    }

    async fn whitelist(&self, account: Address) -> Result<bool> {
        self.contract
            .whitelist(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn votation_finished(&self) -> Result<bool> {
        self.contract
            .votationFinished()
            .call()
            .await
            .map_err(contract_error)
    }

    async fn winner(&self) -> Result<i32> {
        self.contract.winner().call().await.map_err(contract_error)
    }
}
