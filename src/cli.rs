//! Shared helpers for the command-line binaries

use crate::crypto::{parse_eth_address, KeyPair};
use crate::error::{LabError, Result};
use crate::explorer::Balance;
use crate::hdwallet::{DerivedAddress, HdWallet};
use alloy::primitives::{Address, U256};
use bitcoin::Amount;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,chainlab=info";

/// Installs the stderr subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn print_header(title: &str) {
    let bar = "═".repeat(title.chars().count() + 4);
    println!("{}", format!("╔{}╗", bar).bright_cyan());
    println!("{}", format!("║  {}  ║", title).bright_cyan().bold());
    println!("{}", format!("╚{}╝", bar).bright_cyan());
    println!();
}

/// A table in the house style with bold headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}

/// One row per `(role, address, balance)`, amounts in satoshis.
pub fn balance_table(rows: &[(&str, &bitcoin::Address, Balance)]) -> Table {
    let mut table = new_table(&["Role", "Address", "Confirmed", "Unconfirmed", "Total"]);
    for (role, address, balance) in rows {
        table.add_row(vec![
            role.to_string(),
            address.to_string(),
            balance.confirmed.to_sat().to_string(),
            balance.unconfirmed.to_sat().to_string(),
            balance.total().to_sat().to_string(),
        ]);
    }
    table
}

/// Prints the keys of a freshly created or restored wallet, then one row
/// per derived address.
pub fn print_wallet_summary(wallet: &HdWallet, addresses: &[DerivedAddress]) {
    println!("{} {}", "Seed phrase:    ".bright_white(), wallet.phrase().bright_yellow());
    println!("{} {}", "Root derivation:".bright_white(), wallet.root_derivation());
    println!("{} {}", "Account xprv:   ".bright_white(), wallet.xprv());
    println!("{} {}", "Account xpub:   ".bright_white(), wallet.xpub());
    println!();

    let mut table = new_table(&["Chain", "Path", "Address", "Private key (WIF)"]);
    for derived in addresses {
        table.add_row(vec![
            derived.chain.to_string(),
            derived.path_string(),
            derived.address.to_string(),
            derived.wif(),
        ]);
    }
    println!("{}", table);
}

/// Reads one trimmed line from stdin after printing `prompt`.
pub fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt.bright_white());
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        return Err(LabError::Config("Input closed before an answer was given".to_string()));
    }
    Ok(line.trim().to_string())
}

/// Reads a line without echoing it.
pub fn prompt_secret(prompt: &str) -> Result<String> {
    let secret = rpassword::prompt_password(prompt.bright_white().to_string())?;
    Ok(secret.trim().to_string())
}

/// Asks until a well-formed Ethereum address is entered.
pub fn prompt_eth_address(prompt: &str) -> Result<Address> {
    loop {
        let input = prompt_line(prompt)?;
        match parse_eth_address(&input) {
            Ok(address) => return Ok(address),
            Err(e) => eprintln!("{}", format!("✗ {}", e).red()),
        }
    }
}

/// Asks for a hex private key without echo until one parses.
pub fn prompt_private_key(prompt: &str) -> Result<KeyPair> {
    loop {
        let input = prompt_secret(prompt)?;
        match KeyPair::from_secret_hex(&input) {
            Ok(key) => return Ok(key),
            Err(e) => eprintln!("{}", format!("✗ {}", e).red()),
        }
    }
}

pub fn format_sats(amount: Amount) -> String {
    format!("{} sats ({} tBTC)", amount.to_sat(), amount.to_btc())
}

/// Wei rendered as ether with up to 18 decimals, trailing zeros removed.
pub fn format_ether(wei: U256) -> String {
    let unit = U256::from(1_000_000_000_000_000_000u64);
    let whole = wei / unit;
    let frac = wei % unit;
    if frac.is_zero() {
        return format!("{} ETH", whole);
    }
    let frac = format!("{:0>18}", frac.to_string());
    format!("{}.{} ETH", whole, frac.trim_end_matches('0'))
}

/// `0x1234...abcd` style shortening for wide columns.
pub fn shorten(text: &str, keep: usize) -> String {
    if text.chars().count() <= keep * 2 + 3 {
        return text.to_string();
    }
    let head: String = text.chars().take(keep).collect();
    let tail: String = text.chars().skip(text.chars().count() - keep).collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdwallet::parse_address;
    use bitcoin::Network;

    #[test]
    fn test_balance_table_rows() {
        let from = parse_address("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn", Network::Testnet).unwrap();
        let to = parse_address("mz2R4owRMucX3euEUgV8FoGvEuw8fp8kni", Network::Testnet).unwrap();
        let sender = Balance {
            confirmed: Amount::from_sat(50_000),
            unconfirmed: Amount::from_sat(1_500),
        };
        let receiver = Balance {
            confirmed: Amount::ZERO,
            unconfirmed: Amount::from_sat(10_000),
        };

        let rendered = balance_table(&[("From", &from, sender), ("To", &to, receiver)]).to_string();
        assert!(rendered.contains("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"));
        assert!(rendered.contains("mz2R4owRMucX3euEUgV8FoGvEuw8fp8kni"));
        assert!(rendered.contains("51500"));
        assert!(rendered.contains("10000"));
    }

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::ZERO), "0 ETH");
        assert_eq!(format_ether(U256::from(10_000_000_000_000_000_000u128)), "10 ETH");
        assert_eq!(format_ether(U256::from(1_500_000_000_000_000_000u128)), "1.5 ETH");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001 ETH");
    }

    #[test]
    fn test_format_sats() {
        assert_eq!(format_sats(Amount::from_sat(20)), "20 sats (0.0000002 tBTC)");
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("abcdef", 4), "abcdef");
        assert_eq!(
            shorten("0x1f3569c66b9a8ab114a49d85229970e57e676211", 6),
            "0x1f35...676211"
        );
    }

    #[test]
    fn test_table_has_headers() {
        let mut table = new_table(&["Path", "Address"]);
        table.add_row(vec!["m/44'/1'/0'/0/0", "mz2R4owRMucX3euEUgV8FoGvEuw8fp8kni"]);
        let rendered = table.to_string();
        assert!(rendered.contains("Path"));
        assert!(rendered.contains("mz2R4owRMucX3euEUgV8FoGvEuw8fp8kni"));
    }
}
