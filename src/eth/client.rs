//! JSON-RPC connection and transaction submission

use super::bindings::{SimpleCounter, VotationSystem};
use crate::config::EthereumConfig;
use crate::contracts::Event;
use crate::crypto::KeyPair;
use crate::error::{LabError, Result};
use crate::scripts::TxOutcome;
use alloy::contract::{CallBuilder, CallDecoder, Error as ContractError, RawCallBuilder};
use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::{Log, TransactionReceipt};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::decode_revert_reason;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

const RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Gas and confirmation settings applied to every transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSettings {
    pub gas_limit: u64,
    pub gas_price_wei: u128,
    /// Blocks to wait for after sending. Zero returns as soon as the node
    /// accepts the transaction.
    pub confirmations: u64,
    pub chain_id: Option<u64>,
}

impl TxSettings {
    pub fn from_config(config: &EthereumConfig) -> Self {
        TxSettings {
            gas_limit: config.gas_limit,
            gas_price_wei: config.gas_price_wei(),
            confirmations: config.confirmations,
            chain_id: config.chain_id,
        }
    }
}

#[derive(Clone)]
pub struct EthClient {
    rpc_url: String,
    provider: DynProvider,
    sender: Option<Address>,
    settings: TxSettings,
}

impl fmt::Debug for EthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthClient")
            .field("rpc_url", &self.rpc_url)
            .field("sender", &self.sender)
            .field("settings", &self.settings)
            .finish()
    }
}

impl EthClient {
    /// Connects to `rpc_url`. Without a signer the client can only read.
    pub async fn connect(rpc_url: &str, signer: Option<&KeyPair>, settings: TxSettings) -> Result<Self> {
        let (provider, sender) = match signer {
            Some(key) => {
                let signer = PrivateKeySigner::from_slice(&key.secret_key.secret_bytes())
                    .map_err(|e| LabError::Crypto(format!("Unusable signing key: {}", e)))?;
                let sender = signer.address();
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect(rpc_url)
                    .await
                    .map_err(|e| rpc_error("connect", e))?
                    .erased();
                (provider, Some(sender))
            }
            None => {
                let provider = ProviderBuilder::new()
                    .connect(rpc_url)
                    .await
                    .map_err(|e| rpc_error("connect", e))?
                    .erased();
                (provider, None)
            }
        };

        debug!("Connected to {} (signer: {:?})", rpc_url, sender);
        Ok(EthClient {
            rpc_url: rpc_url.to_string(),
            provider,
            sender,
            settings,
        })
    }

    /// A second client on the same endpoint signing with `key`.
    pub async fn as_signer(&self, key: &KeyPair) -> Result<Self> {
        Self::connect(&self.rpc_url, Some(key), self.settings.clone()).await
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn settings(&self) -> &TxSettings {
        &self.settings
    }

    pub fn set_confirmations(&mut self, confirmations: u64) {
        self.settings.confirmations = confirmations;
    }

    pub fn sender(&self) -> Option<Address> {
        self.sender
    }

    pub fn require_sender(&self) -> Result<Address> {
        self.sender
            .ok_or_else(|| LabError::Config("This operation needs a private key".to_string()))
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| rpc_error("eth_chainId", e))
    }

    pub async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| rpc_error("eth_blockNumber", e))
    }

    pub async fn balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .map_err(|e| rpc_error("eth_getBalance", e))
    }

    pub async fn nonce(&self, account: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(account)
            .await
            .map_err(|e| rpc_error("eth_getTransactionCount", e))
    }

    pub fn counter_at(&self, address: Address) -> SimpleCounter::SimpleCounterInstance<DynProvider> {
        SimpleCounter::new(address, self.provider.clone())
    }

    pub fn votation_at(&self, address: Address) -> VotationSystem::VotationSystemInstance<DynProvider> {
        VotationSystem::new(address, self.provider.clone())
    }

    /// Signs and broadcasts `call` with an explicit nonce, gas limit and gas
    /// price, then waits for the configured number of confirmations.
    pub async fn submit<D>(&self, call: CallBuilder<&DynProvider, D>, label: &str) -> Result<TxOutcome>
    where
        D: CallDecoder + Send + Sync,
    {
        let from = self.require_sender()?;
        let nonce = self.nonce(from).await?;
        let call = self.apply_settings(call, from, nonce);

        // An eth_call first turns a require() failure into a readable
        // error instead of a mined, failed transaction.
        call.call_raw().await.map_err(contract_error)?;

        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = *pending.tx_hash();
        info!("{} sent: {}", label, tx_hash);

        if self.settings.confirmations == 0 {
            return Ok(TxOutcome::pending(tx_hash));
        }

        let receipt = self
            .wait_for_receipt(pending, label, self.settings.confirmations)
            .await?;
        Ok(TxOutcome::confirmed(tx_hash, decode_events(&receipt)))
    }

    /// Deploys creation bytecode and returns the new contract's address
    /// once the deployment is mined.
    pub async fn deploy(&self, bytecode: Bytes, label: &str) -> Result<(Address, TxHash)> {
        let from = self.require_sender()?;
        let nonce = self.nonce(from).await?;
        let call: RawCallBuilder<&DynProvider> = CallBuilder::new_raw_deploy(&self.provider, bytecode);
        let call = self.apply_settings(call, from, nonce);

        let pending = call.send().await.map_err(contract_error)?;
        let tx_hash = *pending.tx_hash();
        info!("{} deployment sent: {}", label, tx_hash);

        let receipt = self
            .wait_for_receipt(pending, label, self.settings.confirmations.max(1))
            .await?;
        let address = receipt
            .contract_address
            .ok_or_else(|| LabError::TransactionFailed(tx_hash.to_string()))?;

        info!("{} deployed at {}", label, address);
        Ok((address, tx_hash))
    }

    fn apply_settings<'a, D>(
        &self,
        call: CallBuilder<&'a DynProvider, D>,
        from: Address,
        nonce: u64,
    ) -> CallBuilder<&'a DynProvider, D>
    where
        D: CallDecoder,
    {
        let call = call
            .from(from)
            .nonce(nonce)
            .gas(self.settings.gas_limit)
            .gas_price(self.settings.gas_price_wei);
        match self.settings.chain_id {
            Some(chain_id) => call.chain_id(chain_id),
            None => call,
        }
    }

    async fn wait_for_receipt(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
        label: &str,
        confirmations: u64,
    ) -> Result<TransactionReceipt> {
        let tx_hash = *pending.tx_hash();
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!(
            "Waiting for {} confirmation(s) of {}",
            confirmations, label
        ));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = pending
            .with_required_confirmations(confirmations)
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await;
        spinner.finish_and_clear();

        let receipt = result.map_err(|e| rpc_error("receipt", e))?;
        if !receipt.status() {
            return Err(LabError::TransactionFailed(tx_hash.to_string()));
        }
        debug!("{} mined in block {:?}", tx_hash, receipt.block_number);
        Ok(receipt)
    }
}

/// Events of the classroom contracts found in a receipt, in log order.
pub fn decode_events(receipt: &TransactionReceipt) -> Vec<Event> {
    decode_logs(receipt.logs())
}

/// Decodes `NewValue` and `VotationFinished` logs, skipping anything else.
pub fn decode_logs(logs: &[Log]) -> Vec<Event> {
    logs.iter()
        .filter_map(|log| {
            if let Ok(decoded) = log.log_decode::<SimpleCounter::NewValue>() {
                let data = decoded.inner.data;
                return Some(Event::NewValue {
                    sender: data.sender,
                    new_number: data.newNumber,
                });
            }
            if let Ok(decoded) = log.log_decode::<VotationSystem::VotationFinished>() {
                return Some(Event::VotationFinished {
                    winner: decoded.inner.data.winner,
                });
            }
            None
        })
        .collect()
}

fn rpc_error(context: &str, err: impl fmt::Display) -> LabError {
    LabError::Rpc(format!("{}: {}", context, err))
}

/// Text of a `revert("...")`, or the raw data in hex when it carries none.
pub fn revert_reason(data: &[u8]) -> String {
    match decode_revert_reason(data) {
        Some(reason) => reason
            .strip_prefix("revert: ")
            .map(str::to_string)
            .unwrap_or(reason),
        None => format!("0x{}", hex::encode(data)),
    }
}

pub(crate) fn contract_error(err: ContractError) -> LabError {
    if let Some(data) = err.as_revert_data() {
        return LabError::Reverted(revert_reason(&data));
    }

    reverted_from_message(err.to_string())
}

/// Node error text such as `execution reverted: reason` as a revert.
fn reverted_from_message(message: String) -> LabError {
    match message.find("execution reverted") {
        Some(start) => {
            let reason = message[start..]
                .trim_start_matches("execution reverted")
                .trim_start_matches(':')
                .trim();
            LabError::Reverted(reason.to_string())
        }
        None => LabError::Rpc(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};
    use alloy::sol_types::{Revert, SolError, SolEvent};

    fn rpc_log(address: Address, data: alloy::primitives::LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address, data },
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_logs_in_order() {
        let contract = Address::repeat_byte(0xcc);
        let sender = Address::repeat_byte(0x11);
        let new_value = SimpleCounter::NewValue {
            sender,
            newNumber: U256::from(8u64),
        };
        let finished = VotationSystem::VotationFinished { winner: 13 };
        let unrelated = alloy::primitives::LogData::new_unchecked(
            vec![alloy::primitives::B256::repeat_byte(0x42)],
            Bytes::from(vec![0u8; 32]),
        );

        let logs = vec![
            rpc_log(contract, new_value.encode_log_data()),
            rpc_log(contract, unrelated),
            rpc_log(contract, finished.encode_log_data()),
        ];
        let events = decode_logs(&logs);

        assert_eq!(
            events,
            vec![
                Event::NewValue {
                    sender,
                    new_number: U256::from(8u64),
                },
                Event::VotationFinished { winner: 13 },
            ]
        );
    }

    #[test]
    fn test_reverted_from_node_message() {
        let err = reverted_from_message(
            "server returned an error response: error code 3: execution reverted: Caller is not owner"
                .to_string(),
        );
        assert!(matches!(err, LabError::Reverted(ref reason) if reason == "Caller is not owner"));

        let err = reverted_from_message("connection refused".to_string());
        assert!(matches!(err, LabError::Rpc(_)));
    }

    #[test]
    fn test_revert_reason_from_error_string() {
        let data = Revert::from("Caller is not owner").abi_encode();
        assert_eq!(revert_reason(&data), "Caller is not owner");
    }

    #[test]
    fn test_revert_reason_unknown_data() {
        assert_eq!(revert_reason(&[0xde, 0xad, 0xbe, 0xef]), "0xdeadbeef");
    }

    #[test]
    fn test_settings_from_config() {
        let config = EthereumConfig {
            chain_id: Some(11_155_111),
            confirmations: 2,
            ..EthereumConfig::default()
        };
        let settings = TxSettings::from_config(&config);
        assert_eq!(settings.gas_limit, 2_000_000);
        assert_eq!(settings.gas_price_wei, 20_000_000_000);
        assert_eq!(settings.confirmations, 2);
        assert_eq!(settings.chain_id, Some(11_155_111));
    }
}
