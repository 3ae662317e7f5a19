#![forbid(unsafe_code)]
//! Run the contract exercises against in-process contracts
//!
//! No node is needed: every contract runs on a local chain funded with the
//! standard developer accounts.

use chainlab::cli::{format_ether, init_tracing, new_table, print_header};
use chainlab::contracts::{dev_accounts, DevAccounts, MessageWall, PersonalWallet, UserRegistration};
use chainlab::crypto::to_checksum;
use chainlab::scripts::{counter_deploy_demo, votation_demo, CounterApi, LocalChain};
use chainlab::error::LabError;
use alloy::primitives::U256;
use clap::{Parser, ValueEnum};
use colored::*;

const DEV_BALANCE_WEI: u128 = 10_000 * 1_000_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Flow {
    Counter,
    Votation,
    Wallet,
    Wall,
}

#[derive(Parser)]
#[command(author, version, about = "Run contract flows in process", long_about = None)]
struct Cli {
    /// Flows to run; all of them when omitted
    #[arg(long = "flow", value_enum)]
    flows: Vec<Flow>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let flows = if cli.flows.is_empty() {
        vec![Flow::Counter, Flow::Votation, Flow::Wallet, Flow::Wall]
    } else {
        cli.flows
    };

    let accounts = dev_accounts()?;
    let chain = LocalChain::new();
    for address in accounts.addresses() {
        chain.fund(address, U256::from(DEV_BALANCE_WEI));
    }

    for flow in flows {
        match flow {
            Flow::Counter => counter_flow(&chain, &accounts).await?,
            Flow::Votation => votation_flow(&chain, &accounts).await?,
            Flow::Wallet => wallet_flow(&chain, &accounts)?,
            Flow::Wall => wall_flow(&chain, &accounts)?,
        }
        println!();
    }

    Ok(())
}

async fn counter_flow(chain: &LocalChain, accounts: &DevAccounts) -> Result<(), Box<dyn std::error::Error>> {
    print_header("SimpleCounter");
    let owner = accounts[0].eth_address();
    let friend = accounts[1].eth_address();

    let counter = chain.deploy_counter(owner);
    println!("{} {}", "Deployed at:".bright_white(), to_checksum(&counter.address()));

    let run = counter_deploy_demo(&counter).await?;
    println!("{} {} -> {:?}", "Owner increases:".bright_white(), run.before, run.after);

    let outsider = counter.connect_as(friend);
    match outsider.increase_number().await {
        Err(LabError::Reverted(reason)) => println!("{} {}", "Outsider reverted:".bright_white(), reason.red()),
        other => println!("{} {:?}", "Unexpected:".red(), other),
    }

    counter.add_to_white_list(friend).await?;
    let outcome = outsider.increase_number().await?;
    println!(
        "{} {:?}",
        "Whitelisted friend increases to:".bright_white(),
        outcome.new_number()
    );

    counter.decrease_number().await?;
    counter.decrease_number().await?;
    if let Err(LabError::Reverted(reason)) = counter.decrease_number().await {
        println!("{} {}", "Below zero reverted:".bright_white(), reason.red());
    }
    Ok(())
}

async fn votation_flow(chain: &LocalChain, accounts: &DevAccounts) -> Result<(), Box<dyn std::error::Error>> {
    print_header("VotationSystem");
    let votation = chain.deploy_votation(accounts[0].eth_address());
    let voters: Vec<_> = accounts.iter().skip(1).take(5).cloned().collect();

    let report = votation_demo(
        &votation,
        &[7, 11, 13],
        &voters,
        &[(0, 7), (1, 11), (2, 11), (3, 13), (4, 11)],
    )
    .await?;

    let mut table = new_table(&["Candidate", "Votes"]);
    for candidate in &report.candidates {
        table.add_row(vec![candidate.id.to_string(), candidate.votes.to_string()]);
    }
    println!("{}", table);
    println!("{} {}", "Winner:".bright_white(), report.winner.to_string().bright_green().bold());
    Ok(())
}

fn wallet_flow(chain: &LocalChain, accounts: &DevAccounts) -> Result<(), Box<dyn std::error::Error>> {
    print_header("PersonalWallet");
    let owner = accounts[0].eth_address();
    let payer = accounts[2].eth_address();
    let payee = accounts[3].eth_address();
    let one_ether = U256::from(1_000_000_000_000_000_000u64);

    let (mut wallet, _) = chain.execute(owner, |env| Ok(PersonalWallet::deploy(env)))?;
    chain.execute(payer, |env| {
        env.set_value_transferred(one_ether * U256::from(2u64));
        wallet.deposit(env)
    })?;
    println!("{} {}", "After deposit:".bright_white(), format_ether(wallet.get_balance()));

    chain.execute(owner, |env| wallet.send_coin(env, payee, one_ether))?;
    println!("{} {}", "After payout: ".bright_white(), format_ether(wallet.get_balance()));
    println!("{} {}", "Payee balance:".bright_white(), format_ether(chain.balance_of(&payee)));

    if let Err(LabError::Reverted(reason)) = chain.execute(payer, |env| wallet.send_coin(env, payer, one_ether)) {
        println!("{} {}", "Stranger payout reverted:".bright_white(), reason.red());
    }
    Ok(())
}

fn wall_flow(chain: &LocalChain, accounts: &DevAccounts) -> Result<(), Box<dyn std::error::Error>> {
    print_header("MessageWall");
    let alice = accounts[4].eth_address();
    let mallory = accounts[5].eth_address();

    let (mut registry, _) = chain.execute(alice, |env| Ok(UserRegistration::deploy(env)))?;
    let (mut wall, _) = chain.execute(alice, |env| Ok(MessageWall::deploy(env, registry.address())))?;

    chain.execute(alice, |env| registry.register_user(env, "alice"))?;
    chain.execute(alice, |env| wall.post_message(env, &registry, "alice", "hello from the sandbox"))?;

    if let Err(LabError::Reverted(reason)) =
        chain.execute(mallory, |env| wall.post_message(env, &registry, "mallory", "spam"))
    {
        println!("{} {}", "Unregistered post reverted:".bright_white(), reason.red());
    }

    for message in wall.get_last_10_messages() {
        println!("  {}", message);
    }
    Ok(())
}
