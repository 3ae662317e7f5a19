#![forbid(unsafe_code)]
//! Restore a testnet wallet from its seed phrase

use chainlab::cli::{init_tracing, print_header, print_wallet_summary, prompt_secret};
use chainlab::config::load_config;
use chainlab::hdwallet::HdWallet;
use chainlab::wallet::{WalletFile, WalletStore};
use clap::Parser;
use colored::*;

#[derive(Parser)]
#[command(author, version, about = "Restore a testnet HD wallet from its seed phrase", long_about = None)]
struct Cli {
    /// The 12 seed words, quoted. Asked for without echo when omitted
    #[arg(long)]
    phrase: Option<String>,
    /// Name the wallet is stored under
    #[arg(long, default_value = "restored")]
    name: String,
    /// Receiving addresses to derive
    #[arg(long, default_value_t = 1)]
    addresses: u32,
    /// Replace a stored wallet with the same name
    #[arg(long)]
    force: bool,
    /// Print the wallet without saving it
    #[arg(long)]
    no_save: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config()?;

    let phrase = match cli.phrase {
        Some(phrase) => phrase,
        None => prompt_secret("Seed phrase: ")?,
    };

    let mut wallet = HdWallet::from_phrase_with_path(
        &phrase,
        config.bitcoin.network()?,
        &config.bitcoin.account_path,
    )?;

    print_header("Restored testnet wallet");

    let mut derived = Vec::new();
    for _ in 0..cli.addresses.max(1) {
        derived.push(wallet.new_receiving_address()?);
    }
    derived.push(wallet.new_change_address()?);
    print_wallet_summary(&wallet, &derived);

    if cli.no_save {
        return Ok(());
    }

    let store = WalletStore::new(config.wallet.dir.clone());
    let file = WalletFile::from_wallet(&cli.name, &wallet)?;
    let path = if cli.force {
        store.store(&file)?
    } else {
        store.create(&file)?
    };
    println!();
    println!(
        "{}",
        format!("✅ Wallet '{}' saved to {}", file.name, path.display()).green()
    );

    Ok(())
}
