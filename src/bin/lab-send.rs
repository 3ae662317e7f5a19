#![forbid(unsafe_code)]
//! Send testnet coins from one of a wallet's addresses

use chainlab::cli::{balance_table, format_sats, init_tracing, print_header, prompt_line};
use chainlab::config::load_config;
use chainlab::explorer::{ChainSource, EsploraClient};
use chainlab::hdwallet::{parse_address, KeyChain};
use chainlab::transfer::{self, DUST_LIMIT_SATS};
use chainlab::wallet::{WalletStore, DEFAULT_WALLET_NAME};
use bitcoin::Amount;
use clap::Parser;
use colored::*;

const CLASSROOM_DESTINATION: &str = "mz2R4owRMucX3euEUgV8FoGvEuw8fp8kni";

#[derive(Parser)]
#[command(author, version, about = "Send testnet coins", long_about = None)]
struct Cli {
    /// Amount to send, in satoshis
    amount: u64,
    /// Destination address
    #[arg(long, default_value = CLASSROOM_DESTINATION)]
    to: String,
    /// Stored wallet to spend from
    #[arg(long, default_value = DEFAULT_WALLET_NAME)]
    wallet: String,
    /// Sending address; defaults to the wallet's first receiving address
    #[arg(long)]
    from: Option<String>,
    /// Fee in satoshis; defaults to bitcoin.fee_sats
    #[arg(long)]
    fee: Option<u64>,
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config()?;
    let network = config.bitcoin.network()?;

    if cli.amount < DUST_LIMIT_SATS {
        return Err(format!(
            "{} sats is below the dust limit of {} sats and would not be relayed",
            cli.amount, DUST_LIMIT_SATS
        )
        .into());
    }

    let wallet = WalletStore::new(config.wallet.dir.clone())
        .load_named(&cli.wallet)?
        .open()?;
    let from = match &cli.from {
        Some(address) => parse_address(address, network)?,
        None => wallet.derive(KeyChain::Receiving, 0)?.address,
    };
    let key = wallet.privkey(&from)?;
    let to = parse_address(&cli.to, network)?;
    let amount = Amount::from_sat(cli.amount);
    let fee = Amount::from_sat(cli.fee.unwrap_or(config.bitcoin.fee_sats));

    let explorer = EsploraClient::new(&config.bitcoin.esplora_url)?;
    print_header("Send testnet coins");

    println!("{} {}", "From:   ".bright_white(), from);
    println!("{} {}", "To:     ".bright_white(), to);
    println!("{} {}", "Amount: ".bright_white(), format_sats(amount));
    println!("{} {}", "Fee:    ".bright_white(), format_sats(fee));
    println!();
    println!("{}", "Balances before".bright_white());
    let sender_before = explorer.balance(&from).await?;
    let receiver_before = explorer.balance(&to).await?;
    println!(
        "{}",
        balance_table(&[("From", &from, sender_before), ("To", &to, receiver_before)])
    );
    println!();

    if !cli.yes {
        let answer = prompt_line("Broadcast this transaction? [y/N] ")?;
        if !answer.eq_ignore_ascii_case("y") && !answer.eq_ignore_ascii_case("yes") {
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    let txid = transfer::send(&explorer, &key, &from, &to, amount, fee).await?;
    println!("{}", format!("✅ Broadcast {}", txid).green().bold());

    println!();
    println!("{}", "Balances after (incl. unconfirmed)".bright_white());
    let sender_after = explorer.balance(&from).await?;
    let receiver_after = explorer.balance(&to).await?;
    println!(
        "{}",
        balance_table(&[("From", &from, sender_after), ("To", &to, receiver_after)])
    );

    Ok(())
}
