#![forbid(unsafe_code)]
//! Show the testnet balance of a wallet's addresses

use chainlab::cli::{format_sats, init_tracing, new_table, print_header};
use chainlab::config::load_config;
use chainlab::explorer::{ChainSource, EsploraClient};
use chainlab::hdwallet::{parse_address, KeyChain};
use chainlab::wallet::{WalletStore, DEFAULT_WALLET_NAME};
use bitcoin::{Address, Amount};
use clap::Parser;
use colored::*;

#[derive(Parser)]
#[command(author, version, about = "Show testnet balances", long_about = None)]
struct Cli {
    /// Stored wallet whose handed-out addresses are queried
    #[arg(long, default_value = DEFAULT_WALLET_NAME)]
    wallet: String,
    /// Query these addresses instead of a wallet
    #[arg(long = "address")]
    addresses: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config()?;
    let network = config.bitcoin.network()?;

    let mut rows: Vec<(String, Address)> = Vec::new();
    if cli.addresses.is_empty() {
        let wallet = WalletStore::new(config.wallet.dir.clone())
            .load_named(&cli.wallet)?
            .open()?;
        let (next_receive, next_change) = wallet.cursors();
        for (chain, count) in [
            (KeyChain::Receiving, next_receive.max(1)),
            (KeyChain::Change, next_change),
        ] {
            for index in 0..count {
                let derived = wallet.derive(chain, index)?;
                rows.push((derived.path_string(), derived.address));
            }
        }
    } else {
        for input in &cli.addresses {
            rows.push(("-".to_string(), parse_address(input, network)?));
        }
    }

    let explorer = EsploraClient::new(&config.bitcoin.esplora_url)?;
    print_header("Testnet balance");
    println!("{} {}", "Explorer:".bright_white(), explorer.base_url());
    println!();

    let mut table = new_table(&["Path", "Address", "Confirmed", "Unconfirmed"]);
    let mut confirmed = Amount::ZERO;
    let mut unconfirmed = Amount::ZERO;
    for (path, address) in &rows {
        let balance = explorer.balance(address).await?;
        confirmed += balance.confirmed;
        unconfirmed += balance.unconfirmed;
        table.add_row(vec![
            path.clone(),
            address.to_string(),
            balance.confirmed.to_sat().to_string(),
            balance.unconfirmed.to_sat().to_string(),
        ]);
    }
    println!("{}", table);
    println!();
    println!("{} {}", "Confirmed:  ".bright_white(), format_sats(confirmed).green());
    println!("{} {}", "Unconfirmed:".bright_white(), format_sats(unconfirmed).yellow());
    println!(
        "{} {}",
        "Total:      ".bright_white(),
        format_sats(confirmed + unconfirmed).bright_green().bold()
    );

    Ok(())
}
