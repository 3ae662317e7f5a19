#![forbid(unsafe_code)]
//! Read and write the SimpleCounter contract over JSON-RPC

use chainlab::cli::{format_ether, init_tracing, print_header, prompt_eth_address, prompt_private_key};
use chainlab::config::{load_config, Config};
use chainlab::contracts::get_account;
use chainlab::crypto::{parse_eth_address, to_checksum, KeyPair};
use chainlab::eth::{load_artifact, EthClient, RemoteCounter, TxSettings};
use chainlab::scripts::{counter_deploy_demo, counter_interaction, CounterApi, TxOutcome};
use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Interact with the SimpleCounter contract", long_about = None)]
struct Cli {
    /// Contract address; defaults to ethereum.counter_address
    #[arg(long, global = true)]
    contract: Option<String>,
    /// JSON-RPC endpoint; defaults to $NODE or ethereum.rpc_url
    #[arg(long, global = true)]
    rpc_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for an account and key, read the number and increase it once
    Interact {
        /// Wait for the transaction to be mined before exiting
        #[arg(long)]
        wait: bool,
    },
    /// Read the current number
    Read {
        /// Account the view call is made from
        #[arg(long)]
        from: Option<String>,
    },
    /// Increase the number by one
    Increase,
    /// Decrease the number by one
    Decrease,
    /// Check whether an account is whitelisted
    Status {
        account: String,
    },
    /// Add an account to the whitelist (owner only)
    Allow {
        account: String,
    },
    /// Remove an account from the whitelist (owner only)
    Revoke {
        account: String,
    },
    /// Deploy from a compiled artifact, then read, increase and read again
    Deploy {
        /// Artifact JSON with a `bytecode` field
        artifact: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = load_config()?;
    if let Some(url) = &cli.rpc_url {
        config.ethereum.rpc_url = url.clone();
    }
    let contract = parse_eth_address(
        cli.contract
            .as_deref()
            .unwrap_or(&config.ethereum.counter_address),
    )?;

    match cli.command {
        Commands::Interact { wait } => interact(&config, contract, wait).await?,
        Commands::Read { from } => {
            let client = connect(&config, None).await?;
            let mut counter = RemoteCounter::new(client, contract);
            if let Some(from) = from {
                counter = counter.with_reader(parse_eth_address(&from)?);
            }
            let number = counter.retrieve_number().await?;
            println!("{} {}", "Current number:".bright_white(), number.to_string().bright_green().bold());
        }
        Commands::Increase => {
            let counter = signed_counter(&config, contract).await?;
            let outcome = counter.increase_number().await?;
            report(&outcome);
        }
        Commands::Decrease => {
            let counter = signed_counter(&config, contract).await?;
            let outcome = counter.decrease_number().await?;
            report(&outcome);
        }
        Commands::Status { account } => {
            let account = parse_eth_address(&account)?;
            let counter = RemoteCounter::new(connect(&config, None).await?, contract);
            let allowed = counter.white_list(account).await?;
            let status = if allowed { "whitelisted".green() } else { "not whitelisted".red() };
            println!("{} is {}", to_checksum(&account), status);
        }
        Commands::Allow { account } => {
            let account = parse_eth_address(&account)?;
            let counter = signed_counter(&config, contract).await?;
            report(&counter.add_to_white_list(account).await?);
        }
        Commands::Revoke { account } => {
            let account = parse_eth_address(&account)?;
            let counter = signed_counter(&config, contract).await?;
            report(&counter.remove_from_white_list(account).await?);
        }
        Commands::Deploy { artifact } => deploy(&config, &artifact).await?,
    }

    Ok(())
}

async fn connect(config: &Config, signer: Option<&KeyPair>) -> Result<EthClient, Box<dyn std::error::Error>> {
    let rpc_url = config.ethereum.require_rpc_url()?;
    let client = EthClient::connect(rpc_url, signer, TxSettings::from_config(&config.ethereum)).await?;
    Ok(client)
}

/// The configured key, or one typed in at the prompt.
fn signing_key(config: &Config) -> Result<KeyPair, Box<dyn std::error::Error>> {
    if config.ethereum.configured_key().is_some() {
        return Ok(get_account(&config.ethereum)?);
    }
    Ok(prompt_private_key("Private key: ")?)
}

async fn signed_counter(config: &Config, contract: Address) -> Result<RemoteCounter, Box<dyn std::error::Error>> {
    let key = signing_key(config)?;
    println!("{} {}", "Sender:".bright_white(), to_checksum(&key.eth_address()));
    Ok(RemoteCounter::new(connect(config, Some(&key)).await?, contract))
}

async fn interact(config: &Config, contract: Address, wait: bool) -> Result<(), Box<dyn std::error::Error>> {
    print_header("SimpleCounter");

    let account = prompt_eth_address("Public address: ")?;
    let key = prompt_private_key("Private key: ")?;
    if key.eth_address() != account {
        return Err(format!(
            "The private key belongs to {}, not {}",
            to_checksum(&key.eth_address()),
            to_checksum(&account)
        )
        .into());
    }

    let mut client = connect(config, Some(&key)).await?;
    if !wait {
        client.set_confirmations(0);
    }
    let balance = client.balance(account).await?;
    println!("{} {}", "Account balance:".bright_white(), format_ether(balance));

    let counter = RemoteCounter::new(client, contract).with_reader(account);
    let run = counter_interaction(&counter).await?;
    println!("{} {}", "Number before:".bright_white(), run.before.to_string().bright_green());
    report(&run.outcome);
    Ok(())
}

async fn deploy(config: &Config, artifact: &Path) -> Result<(), Box<dyn std::error::Error>> {
    print_header("Deploy SimpleCounter");

    let bytecode = load_artifact(artifact)?;
    let key = get_account(&config.ethereum)?;
    println!("{} {}", "Deployer:".bright_white(), to_checksum(&key.eth_address()));

    let mut client = connect(config, Some(&key)).await?;
    if client.settings().confirmations == 0 {
        client.set_confirmations(1);
    }
    let counter = RemoteCounter::deploy(client, bytecode).await?;
    println!("{} {}", "Deployed at:".bright_white(), to_checksum(&counter.address()).bright_green());

    let run = counter_deploy_demo(&counter).await?;
    println!("{} {}", "Number before:".bright_white(), run.before);
    report(&run.outcome);
    if let Some(after) = run.after {
        println!("{} {}", "Number after: ".bright_white(), after.to_string().bright_green().bold());
    }
    Ok(())
}

fn report(outcome: &TxOutcome) {
    println!("{} {}", "Transaction:".bright_white(), outcome.to_string().bright_cyan());
    if !outcome.confirmed {
        println!("{}", "Sent without waiting for confirmation.".yellow());
        return;
    }
    for event in &outcome.events {
        println!("  {} {:?}", "event".dimmed(), event);
    }
    if let Some(number) = outcome.new_number() {
        println!("{} {}", "New number:".bright_white(), number.to_string().bright_green().bold());
    }
}
