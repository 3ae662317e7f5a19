#![forbid(unsafe_code)]

use colored::*;

fn main() {
    println!("{}", "chainlab".bright_cyan().bold());
    println!("{}", "--------".bright_cyan());
    println!();
    println!(
        "{}",
        "Each exercise is a separate binary.".yellow()
    );
    println!(
        "{}",
        "Use 'cargo run --bin <binary_name> -- --help' to see its options.".yellow()
    );
    println!();
    println!("{}", "Bitcoin testnet:".bright_green().underline());
    println!("  - {}  create a BIP39 wallet and derive its first addresses", "lab-wallet-create".bright_white());
    println!("  - {} restore a wallet from its seed phrase", "lab-wallet-restore".bright_white());
    println!("  - {}        show the balance of wallet addresses", "lab-balance".bright_white());
    println!("  - {}           send testnet coins from a wallet address", "lab-send".bright_white());
    println!();
    println!("{}", "Smart contracts:".bright_green().underline());
    println!("  - {}        read, increase and whitelist on SimpleCounter", "lab-counter".bright_white());
    println!("  - {}       run an election on VotationSystem", "lab-votation".bright_white());
    println!("  - {}        run every contract flow in process", "lab-sandbox".bright_white());
    println!();
    println!("{}", "Configuration:".bright_green().underline());
    println!("  chainlab.toml in the working directory, or the file named by CHAINLAB_CONFIG.");
    println!("  NODE sets the JSON-RPC endpoint, PRIVATE_KEY the signing key.");
    println!();
    println!("{}", "Example:".bright_green().underline());
    println!("{}", "  cargo run --bin lab-sandbox".italic());
}
