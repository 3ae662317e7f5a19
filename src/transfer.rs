//! Building, signing and relaying legacy P2PKH payments

use crate::crypto::SECP256K1_CONTEXT;
use crate::error::{LabError, Result};
use crate::explorer::{ChainSource, Utxo};
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::Message;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, PrivateKey, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use tracing::{debug, info, warn};

/// Outputs below this value are non-standard and will not be relayed.
pub const DUST_LIMIT_SATS: u64 = 546;

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub tx: Transaction,
    pub amount: Amount,
    pub fee: Amount,
    /// Change paid back to the sender, if it cleared the dust limit.
    pub change: Option<Amount>,
}

impl Transfer {
    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }
}

/// Picks UTXOs largest-first, confirmed before unconfirmed, until `target`
/// is covered. Returns the selection and its total value.
pub fn select_coins(utxos: &[Utxo], target: Amount) -> Result<(Vec<Utxo>, Amount)> {
    let mut candidates: Vec<&Utxo> = utxos.iter().collect();
    candidates.sort_by(|a, b| b.confirmed.cmp(&a.confirmed).then(b.value.cmp(&a.value)));

    let mut selected = Vec::new();
    let mut total = Amount::ZERO;
    for utxo in candidates {
        if total >= target {
            break;
        }
        total += utxo.value;
        selected.push(utxo.clone());
    }

    if total < target {
        let available = utxos.iter().map(|u| u.value.to_sat()).sum();
        return Err(LabError::InsufficientFunds {
            needed: target.to_sat(),
            available,
        });
    }

    Ok((selected, total))
}

/// Builds and signs a payment of `amount` from `from` to `to`.
///
/// `from` must be the P2PKH address of `key`. Change that would be dust is
/// left to the miner instead of creating an unspendable output.
pub fn build_p2pkh_transfer(
    key: &PrivateKey,
    from: &Address,
    to: &Address,
    amount: Amount,
    fee: Amount,
    utxos: &[Utxo],
) -> Result<Transfer> {
    if amount.to_sat() < DUST_LIMIT_SATS {
        return Err(LabError::Dust {
            amount: amount.to_sat(),
            limit: DUST_LIMIT_SATS,
        });
    }

    let public_key = key.public_key(&SECP256K1_CONTEXT);
    let own_address = Address::p2pkh(public_key.pubkey_hash(), key.network);
    if &own_address != from {
        return Err(LabError::Wallet(format!(
            "Private key controls {}, not {}",
            own_address, from
        )));
    }

    let target = amount
        .checked_add(fee)
        .ok_or_else(|| LabError::Bitcoin("Amount plus fee overflows".to_string()))?;
    let (selected, total_in) = select_coins(utxos, target)?;

    let leftover = total_in - target;
    let (change, fee) = if leftover.to_sat() >= DUST_LIMIT_SATS {
        (Some(leftover), fee)
    } else {
        if leftover > Amount::ZERO {
            debug!("Adding {} sat of dust change to the fee", leftover.to_sat());
        }
        (None, fee + leftover)
    };

    let input = selected
        .iter()
        .map(|utxo| TxIn {
            previous_output: utxo.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        })
        .collect();

    let mut output = vec![TxOut {
        value: amount,
        script_pubkey: to.script_pubkey(),
    }];
    if let Some(change) = change {
        output.push(TxOut {
            value: change,
            script_pubkey: from.script_pubkey(),
        });
    }

    let mut tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    };

    sign_p2pkh_inputs(&mut tx, key, &from.script_pubkey())?;

    Ok(Transfer {
        tx,
        amount,
        fee,
        change,
    })
}

/// Signs every input of `tx` as spending `script_pubkey` with SIGHASH_ALL.
fn sign_p2pkh_inputs(tx: &mut Transaction, key: &PrivateKey, script_pubkey: &ScriptBuf) -> Result<()> {
    let public_key = key.public_key(&SECP256K1_CONTEXT);
    let mut script_sigs = Vec::with_capacity(tx.input.len());

    {
        let cache = SighashCache::new(&*tx);
        for index in 0..tx.input.len() {
            let sighash = cache
                .legacy_signature_hash(index, script_pubkey, EcdsaSighashType::All.to_u32())
                .map_err(|e| LabError::Bitcoin(format!("Sighash for input {}: {}", index, e)))?;
            let message = Message::from_digest(sighash.to_byte_array());
            let signature = bitcoin::ecdsa::Signature {
                signature: SECP256K1_CONTEXT.sign_ecdsa(&message, &key.inner),
                sighash_type: EcdsaSighashType::All,
            };
            let script_sig = ScriptBuf::builder()
                .push_slice(signature.serialize())
                .push_key(&public_key)
                .into_script();
            script_sigs.push(script_sig);
        }
    }

    for (input, script_sig) in tx.input.iter_mut().zip(script_sigs) {
        input.script_sig = script_sig;
    }
    Ok(())
}

/// Fetches the sender's UTXOs, builds the payment and broadcasts it.
pub async fn send(
    source: &dyn ChainSource,
    key: &PrivateKey,
    from: &Address,
    to: &Address,
    amount: Amount,
    fee: Amount,
) -> Result<Txid> {
    let utxos = source.utxos(from).await?;
    if utxos.is_empty() {
        warn!("No spendable outputs for {}", from);
    }

    let transfer = build_p2pkh_transfer(key, from, to, amount, fee, &utxos)?;
    info!(
        "Sending {} sat from {} to {} (fee {} sat, {} input(s))",
        amount.to_sat(),
        from,
        to,
        transfer.fee.to_sat(),
        transfer.tx.input.len()
    );

    source.broadcast(&transfer.tx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{Network, OutPoint, PublicKey};
    use std::str::FromStr;

    const WIF: &str = "cSWNzrM1CjFt1VZNBV7qTTr1t2fmZUgaQe2FL4jyFQRgTtrYp8Y5";
    const DEST: &str = "mz2R4owRMucX3euEUgV8FoGvEuw8fp8kni";
    const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    fn sender() -> (PrivateKey, Address) {
        let key = PrivateKey::from_wif(WIF).unwrap();
        let public_key = PublicKey::from_private_key(&SECP256K1_CONTEXT, &key);
        (key, Address::p2pkh(public_key.pubkey_hash(), Network::Testnet))
    }

    fn dest() -> Address {
        crate::hdwallet::parse_address(DEST, Network::Testnet).unwrap()
    }

    fn utxo(vout: u32, sats: u64, confirmed: bool) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(Txid::from_str(TXID).unwrap(), vout),
            value: Amount::from_sat(sats),
            confirmed,
        }
    }

    #[test]
    fn test_select_prefers_confirmed_then_largest() {
        let utxos = vec![utxo(0, 5_000, true), utxo(1, 50_000, false), utxo(2, 20_000, true)];
        let (selected, total) = select_coins(&utxos, Amount::from_sat(22_000)).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].outpoint.vout, 2);
        assert_eq!(selected[1].outpoint.vout, 0);
        assert_eq!(total, Amount::from_sat(25_000));
    }

    #[test]
    fn test_select_insufficient() {
        let utxos = vec![utxo(0, 1_000, true)];
        match select_coins(&utxos, Amount::from_sat(2_000)) {
            Err(LabError::InsufficientFunds { needed, available }) => {
                assert_eq!(needed, 2_000);
                assert_eq!(available, 1_000);
            }
            other => panic!("expected insufficient funds, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_with_change() {
        let (key, from) = sender();
        let utxos = vec![utxo(0, 100_000, true)];
        let transfer = build_p2pkh_transfer(
            &key,
            &from,
            &dest(),
            Amount::from_sat(10_000),
            Amount::from_sat(1_000),
            &utxos,
        )
        .unwrap();

        assert_eq!(transfer.tx.input.len(), 1);
        assert_eq!(transfer.tx.output.len(), 2);
        assert_eq!(transfer.tx.output[0].script_pubkey, dest().script_pubkey());
        assert_eq!(transfer.tx.output[1].script_pubkey, from.script_pubkey());
        assert_eq!(transfer.change, Some(Amount::from_sat(89_000)));
        assert_eq!(transfer.fee, Amount::from_sat(1_000));
    }

    #[test]
    fn test_dust_change_goes_to_fee() {
        let (key, from) = sender();
        let utxos = vec![utxo(0, 11_300, true)];
        let transfer = build_p2pkh_transfer(
            &key,
            &from,
            &dest(),
            Amount::from_sat(10_000),
            Amount::from_sat(1_000),
            &utxos,
        )
        .unwrap();

        assert_eq!(transfer.tx.output.len(), 1);
        assert_eq!(transfer.change, None);
        assert_eq!(transfer.fee, Amount::from_sat(1_300));
    }

    #[test]
    fn test_dust_amount_rejected() {
        let (key, from) = sender();
        let utxos = vec![utxo(0, 100_000, true)];
        let result = build_p2pkh_transfer(
            &key,
            &from,
            &dest(),
            Amount::from_sat(20),
            Amount::from_sat(1_000),
            &utxos,
        );
        assert!(matches!(result, Err(LabError::Dust { amount: 20, limit: 546 })));
    }

    #[test]
    fn test_wrong_sender_address_rejected() {
        let (key, _) = sender();
        let utxos = vec![utxo(0, 100_000, true)];
        let result = build_p2pkh_transfer(
            &key,
            &dest(),
            &dest(),
            Amount::from_sat(10_000),
            Amount::from_sat(1_000),
            &utxos,
        );
        assert!(matches!(result, Err(LabError::Wallet(_))));
    }

    #[test]
    fn test_signatures_verify() {
        let (key, from) = sender();
        let utxos = vec![utxo(0, 4_000, true), utxo(1, 9_000, true)];
        let transfer = build_p2pkh_transfer(
            &key,
            &from,
            &dest(),
            Amount::from_sat(12_000),
            Amount::from_sat(500),
            &utxos,
        )
        .unwrap();
        assert_eq!(transfer.tx.input.len(), 2);

        let public_key = key.public_key(&SECP256K1_CONTEXT);
        let cache = SighashCache::new(&transfer.tx);
        for (index, input) in transfer.tx.input.iter().enumerate() {
            let mut pushes = input.script_sig.instructions();
            let sig_bytes = pushes.next().unwrap().unwrap().push_bytes().unwrap().as_bytes().to_vec();
            let key_bytes = pushes.next().unwrap().unwrap().push_bytes().unwrap().as_bytes().to_vec();
            assert_eq!(key_bytes, public_key.to_bytes());

            let signature = bitcoin::ecdsa::Signature::from_slice(&sig_bytes).unwrap();
            assert_eq!(signature.sighash_type, EcdsaSighashType::All);

            let sighash = cache
                .legacy_signature_hash(index, &from.script_pubkey(), EcdsaSighashType::All.to_u32())
                .unwrap();
            let message = Message::from_digest(sighash.to_byte_array());
            SECP256K1_CONTEXT
                .verify_ecdsa(&message, &signature.signature, &public_key.inner)
                .unwrap();
        }
    }
}
