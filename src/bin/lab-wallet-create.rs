#![forbid(unsafe_code)]
//! Create a new BIP39 wallet on the Bitcoin test network

use chainlab::cli::{init_tracing, print_header, print_wallet_summary};
use chainlab::config::load_config;
use chainlab::hdwallet::HdWallet;
use chainlab::wallet::{WalletFile, WalletStore, DEFAULT_WALLET_NAME};
use clap::Parser;
use colored::*;

#[derive(Parser)]
#[command(author, version, about = "Create a testnet HD wallet", long_about = None)]
struct Cli {
    /// Name the wallet is stored under
    #[arg(long, default_value = DEFAULT_WALLET_NAME)]
    name: String,
    /// Print the wallet without saving it
    #[arg(long)]
    no_save: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config()?;

    print_header("New testnet wallet");

    let mut wallet = HdWallet::generate(config.bitcoin.network()?)?;
    let receiving = wallet.new_receiving_address()?;
    let change = wallet.new_change_address()?;
    print_wallet_summary(&wallet, &[receiving, change]);

    println!();
    println!(
        "{}",
        "⚠️  Write the seed phrase down. It is the only way to recover these funds.".yellow()
    );

    if cli.no_save {
        return Ok(());
    }

    let store = WalletStore::new(config.wallet.dir.clone());
    let file = WalletFile::from_wallet(&cli.name, &wallet)?;
    let path = store.create(&file)?;
    println!(
        "{}",
        format!("✅ Wallet '{}' saved to {}", file.name, path.display()).green()
    );

    Ok(())
}
