//! Block explorer access over the Esplora REST API

use crate::error::{LabError, Result};
use async_trait::async_trait;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Address, Amount, OutPoint, Transaction, Txid};
use reqwest::Client;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Confirmed and unconfirmed balance of one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balance {
    pub confirmed: Amount,
    pub unconfirmed: Amount,
}

impl Balance {
    pub fn total(&self) -> Amount {
        self.confirmed + self.unconfirmed
    }
}

/// An unspent output that can fund a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: Amount,
    pub confirmed: bool,
}

/// Anything that can answer balance and UTXO queries and relay transactions.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn balance(&self, address: &Address) -> Result<Balance>;
    async fn utxos(&self, address: &Address) -> Result<Vec<Utxo>>;
    async fn broadcast(&self, tx: &Transaction) -> Result<Txid>;
    async fn tip_height(&self) -> Result<u32>;
}

#[derive(Debug, Deserialize)]
struct AddressStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

impl AddressStats {
    // Mempool spends can exceed mempool funding, so this is signed.
    fn net(&self) -> i64 {
        self.funded_txo_sum as i64 - self.spent_txo_sum as i64
    }
}

#[derive(Debug, Deserialize)]
struct AddressInfo {
    chain_stats: AddressStats,
    mempool_stats: AddressStats,
}

#[derive(Debug, Deserialize)]
struct UtxoStatus {
    confirmed: bool,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    status: UtxoStatus,
}

impl EsploraUtxo {
    fn into_utxo(self) -> Result<Utxo> {
        let txid = Txid::from_str(&self.txid)
            .map_err(|e| LabError::Explorer(format!("Bad txid '{}' in UTXO list: {}", self.txid, e)))?;
        Ok(Utxo {
            outpoint: OutPoint::new(txid, self.vout),
            value: Amount::from_sat(self.value),
            confirmed: self.status.confirmed,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EsploraClient {
    base_url: String,
    http: Client,
}

impl EsploraClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(EsploraClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LabError::Explorer(format!("GET {} returned {}: {}", url, status, body.trim())));
        }
        Ok(body)
    }
}

#[async_trait]
impl ChainSource for EsploraClient {
    async fn balance(&self, address: &Address) -> Result<Balance> {
        let body = self.get_text(&format!("/address/{}", address)).await?;
        let info: AddressInfo = serde_json::from_str(&body)?;

        let confirmed = info.chain_stats.net().max(0) as u64;
        let total = (info.chain_stats.net() + info.mempool_stats.net()).max(0) as u64;

        Ok(Balance {
            confirmed: Amount::from_sat(confirmed),
            unconfirmed: Amount::from_sat(total.saturating_sub(confirmed)),
        })
    }

    async fn utxos(&self, address: &Address) -> Result<Vec<Utxo>> {
        let body = self.get_text(&format!("/address/{}/utxo", address)).await?;
        let raw: Vec<EsploraUtxo> = serde_json::from_str(&body)?;
        raw.into_iter().map(EsploraUtxo::into_utxo).collect()
    }

    async fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let url = self.url("/tx");
        let response = self.http.post(&url).body(serialize_hex(tx)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LabError::Explorer(format!("Broadcast rejected ({}): {}", status, body.trim())));
        }

        let txid = Txid::from_str(body.trim())
            .map_err(|e| LabError::Explorer(format!("Unexpected broadcast reply '{}': {}", body.trim(), e)))?;
        info!("Broadcast transaction {}", txid);
        Ok(txid)
    }

    async fn tip_height(&self) -> Result<u32> {
        let body = self.get_text("/blocks/tip/height").await?;
        body.trim()
            .parse::<u32>()
            .map_err(|e| LabError::Explorer(format!("Unexpected tip height '{}': {}", body.trim(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdwallet::parse_address;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::Router;
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::Network;

    const ADDRESS: &str = "mz2R4owRMucX3euEUgV8FoGvEuw8fp8kni";
    const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    async fn address_info(Path(address): Path<String>) -> (StatusCode, String) {
        if address != ADDRESS {
            return (StatusCode::BAD_REQUEST, "Invalid Bitcoin address".to_string());
        }
        let body = serde_json::json!({
            "address": address,
            "chain_stats": {
                "funded_txo_count": 2, "funded_txo_sum": 150_000,
                "spent_txo_count": 1, "spent_txo_sum": 50_000, "tx_count": 3
            },
            "mempool_stats": {
                "funded_txo_count": 1, "funded_txo_sum": 2_500,
                "spent_txo_count": 0, "spent_txo_sum": 0, "tx_count": 1
            }
        });
        (StatusCode::OK, body.to_string())
    }

    async fn address_utxos(Path(_address): Path<String>) -> String {
        serde_json::json!([
            { "txid": TXID, "vout": 1, "value": 100_000,
              "status": { "confirmed": true, "block_height": 2_500_000 } },
            { "txid": TXID, "vout": 3, "value": 2_500,
              "status": { "confirmed": false } }
        ])
        .to_string()
    }

    async fn spawn_fake_esplora() -> String {
        let app = Router::new()
            .route("/address/:address", get(address_info))
            .route("/address/:address/utxo", get(address_utxos))
            .route("/blocks/tip/height", get(|| async { "2874512\n" }))
            .route("/tx", post(|_body: String| async { TXID.to_string() }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{}/", addr)
    }

    fn empty_tx() -> Transaction {
        Transaction {
            version: Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![],
            output: vec![],
        }
    }

    #[tokio::test]
    async fn test_balance_sums_chain_and_mempool() {
        let client = EsploraClient::new(&spawn_fake_esplora().await).unwrap();
        let address = parse_address(ADDRESS, Network::Testnet).unwrap();

        let balance = client.balance(&address).await.unwrap();
        assert_eq!(balance.confirmed, Amount::from_sat(100_000));
        assert_eq!(balance.unconfirmed, Amount::from_sat(2_500));
        assert_eq!(balance.total(), Amount::from_sat(102_500));
    }

    #[tokio::test]
    async fn test_utxos() {
        let client = EsploraClient::new(&spawn_fake_esplora().await).unwrap();
        let address = parse_address(ADDRESS, Network::Testnet).unwrap();

        let utxos = client.utxos(&address).await.unwrap();
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].outpoint.vout, 1);
        assert_eq!(utxos[0].outpoint.txid.to_string(), TXID);
        assert!(utxos[0].confirmed);
        assert!(!utxos[1].confirmed);
    }

    #[tokio::test]
    async fn test_tip_height_trims_newline() {
        let client = EsploraClient::new(&spawn_fake_esplora().await).unwrap();
        assert_eq!(client.tip_height().await.unwrap(), 2_874_512);
    }

    #[tokio::test]
    async fn test_broadcast_returns_txid() {
        let client = EsploraClient::new(&spawn_fake_esplora().await).unwrap();
        let txid = client.broadcast(&empty_tx()).await.unwrap();
        assert_eq!(txid.to_string(), TXID);
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let client = EsploraClient::new(&spawn_fake_esplora().await).unwrap();
        let other = parse_address("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn", Network::Testnet).unwrap();
        let err = client.balance(&other).await.unwrap_err();
        assert!(matches!(err, LabError::Explorer(_)));
        assert!(err.to_string().contains("Invalid Bitcoin address"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = EsploraClient::new("https://blockstream.info/testnet/api/").unwrap();
        assert_eq!(client.base_url(), "https://blockstream.info/testnet/api");
    }
}
