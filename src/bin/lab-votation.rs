#![forbid(unsafe_code)]
//! Run an election on the VotationSystem contract over JSON-RPC

use chainlab::cli::{init_tracing, new_table, print_header, prompt_private_key};
use chainlab::config::{load_config, Config};
use chainlab::contracts::{dev_accounts, get_account, Candidate};
use chainlab::crypto::{parse_eth_address, to_checksum, KeyPair};
use chainlab::eth::{load_artifact, EthClient, RemoteVotation, TxSettings};
use chainlab::error::LabError;
use chainlab::scripts::{votation_demo, TxOutcome, VotationApi};
use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};

/// Upper bound on candidates listed by `status`.
const MAX_LISTED_CANDIDATES: u64 = 256;

#[derive(Parser)]
#[command(author, version, about = "Interact with the VotationSystem contract", long_about = None)]
struct Cli {
    /// Contract address; defaults to ethereum.votation_address
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
    /// Deploy from a compiled artifact and print the address
    Deploy {
        artifact: PathBuf,
    },
    /// Register a candidate id (owner only)
    AddCandidate {
        #[arg(allow_negative_numbers = true)]
        id: i32,
    },
    /// Put a voter on the white list (owner only)
    AddVoter {
        voter: String,
    },
    /// Cast a vote with the configured or prompted key
    Vote {
        #[arg(allow_negative_numbers = true)]
        id: i32,
    },
    /// Close the election and announce the winner (owner only)
    Finish,
    /// Show candidates, tallies and the winner
    Status,
    /// Deploy on a development node and run a full election with its
    /// funded accounts
    Demo {
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

    match cli.command {
        Commands::Deploy { artifact } => {
            print_header("Deploy VotationSystem");
            let key = get_account(&config.ethereum)?;
            let votation = deploy(&config, &key, &artifact).await?;
            println!("{} {}", "Deployed at:".bright_white(), to_checksum(&votation.address()).bright_green());
        }
        Commands::AddCandidate { id } => {
            let votation = signed_votation(&config, cli.contract.as_deref()).await?;
            report(&votation.add_candidate(id).await?);
        }
        Commands::AddVoter { voter } => {
            let voter = parse_eth_address(&voter)?;
            let votation = signed_votation(&config, cli.contract.as_deref()).await?;
            report(&votation.add_voter(voter).await?);
        }
        Commands::Vote { id } => {
            let votation = signed_votation(&config, cli.contract.as_deref()).await?;
            report(&votation.vote(id).await?);
        }
        Commands::Finish => {
            let votation = signed_votation(&config, cli.contract.as_deref()).await?;
            let outcome = votation.finish_votation().await?;
            report(&outcome);
        }
        Commands::Status => {
            let address = contract_address(&config, cli.contract.as_deref())?;
            let client = connect(&config, None).await?;
            let votation = RemoteVotation::new(client, address);
            print_status(&votation).await?;
        }
        Commands::Demo { artifact } => demo(&config, &artifact).await?,
    }

    Ok(())
}

fn contract_address(config: &Config, flag: Option<&str>) -> Result<Address, Box<dyn std::error::Error>> {
    let input = flag
        .or(config.ethereum.votation_address.as_deref())
        .ok_or("No VotationSystem address: pass --contract or set ethereum.votation_address")?;
    Ok(parse_eth_address(input)?)
}

async fn connect(config: &Config, signer: Option<&KeyPair>) -> Result<EthClient, Box<dyn std::error::Error>> {
    let rpc_url = config.ethereum.require_rpc_url()?;
    let client = EthClient::connect(rpc_url, signer, TxSettings::from_config(&config.ethereum)).await?;
    Ok(client)
}

async fn signed_votation(config: &Config, flag: Option<&str>) -> Result<RemoteVotation, Box<dyn std::error::Error>> {
    let address = contract_address(config, flag)?;
    let key = if config.ethereum.configured_key().is_some() {
        get_account(&config.ethereum)?
    } else {
        prompt_private_key("Private key: ")?
    };
    println!("{} {}", "Sender:".bright_white(), to_checksum(&key.eth_address()));
    Ok(RemoteVotation::new(connect(config, Some(&key)).await?, address))
}

async fn deploy(config: &Config, key: &KeyPair, artifact: &Path) -> Result<RemoteVotation, Box<dyn std::error::Error>> {
    let bytecode = load_artifact(artifact)?;
    let client = connect(config, Some(key)).await?;
    Ok(RemoteVotation::deploy(client, bytecode).await?)
}

/// Reads candidates until the contract reports the index out of range.
async fn read_candidates(votation: &dyn VotationApi) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    let mut candidates = Vec::new();
    for index in 0..MAX_LISTED_CANDIDATES {
        match votation.candidate(index).await {
            Ok(candidate) => candidates.push(candidate),
            Err(LabError::Reverted(_)) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(candidates)
}

async fn print_status(votation: &dyn VotationApi) -> Result<(), Box<dyn std::error::Error>> {
    print_header("VotationSystem");
    println!("{} {}", "Contract:".bright_white(), to_checksum(&votation.address()));

    let candidates = read_candidates(votation).await?;
    print_tally(&candidates);

    if votation.votation_finished().await? {
        print_winner(votation.winner().await?);
    } else {
        println!("{}", "Voting is still open.".yellow());
    }
    Ok(())
}

async fn demo(config: &Config, artifact: &Path) -> Result<(), Box<dyn std::error::Error>> {
    print_header("VotationSystem demo");

    let accounts = dev_accounts()?;
    let owner = &accounts[0];
    let voters: Vec<KeyPair> = accounts.iter().skip(1).take(4).cloned().collect();

    let votation = deploy(config, owner, artifact).await?;
    println!("{} {}", "Deployed at:".bright_white(), to_checksum(&votation.address()).bright_green());

    let report = votation_demo(&votation, &[1, 2, 3], &voters, &[(0, 1), (1, 2), (2, 2), (3, 3)]).await?;
    print_tally(&report.candidates);
    println!("{} {}", "Finish transaction:".bright_white(), report.finish.to_string().bright_cyan());
    print_winner(report.winner);
    Ok(())
}

fn print_tally(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("{}", "No candidates registered.".yellow());
        return;
    }
    let mut table = new_table(&["#", "Candidate", "Votes"]);
    for (index, candidate) in candidates.iter().enumerate() {
        table.add_row(vec![
            index.to_string(),
            candidate.id.to_string(),
            candidate.votes.to_string(),
        ]);
    }
    println!("{}", table);
}

fn print_winner(winner: i32) {
    if winner < 0 {
        println!("{}", "No votes were cast, there is no winner.".yellow());
    } else {
        println!("{} {}", "Winner:".bright_white(), winner.to_string().bright_green().bold());
    }
}

fn report(outcome: &TxOutcome) {
    println!("{} {}", "Transaction:".bright_white(), outcome.to_string().bright_cyan());
    if !outcome.confirmed {
        println!("{}", "Sent without waiting for confirmation.".yellow());
    }
    if let Some(winner) = outcome.winner() {
        print_winner(winner);
    }
}
