//! cpswap - Raydium CP-Swap trading client
//!
//! Quotes and executes swaps against a single CP-Swap (CPMM) pool on Solana
//! devnet or mainnet from plain intents such as `pay 1 SOL` or `buy 50 USDC`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use solana_sdk::pubkey::Pubkey;
use std::io::{self, Write};
use std::path::PathBuf;

mod client;
mod config;
mod cp_swap;
mod intent;
mod pool;
mod prompt;
mod report;
mod session;
mod swap;
mod symbols;

use config::{FileConfig, NetworkConfig, DEFAULT_NETWORK, DEFAULT_SLIPPAGE_PCT};
use session::Session;

#[derive(Parser)]
#[command(name = "cpswap")]
#[command(about = "Raydium CP-Swap CLI - Quote and execute swaps from plain intents", long_about = None)]
#[command(version)]
struct Cli {
    /// Network to connect to (devnet, mainnet)
    #[arg(short, long)]
    network: Option<String>,

    /// RPC URL (overrides network default)
    #[arg(short, long)]
    url: Option<String>,

    /// Path to keypair file
    #[arg(short, long)]
    keypair: Option<PathBuf>,

    /// CP-Swap pool address
    #[arg(short, long)]
    pool: Option<String>,

    /// Slippage tolerance in percent (e.g. 0.5)
    #[arg(short, long)]
    slippage: Option<f64>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an intent and print the pool report
    Quote {
        /// Intent: <verb> <amount> <symbol>, e.g. "pay 1 SOL"
        #[arg(required = true, num_args = 1..)]
        intent: Vec<String>,
    },

    /// Resolve an intent, confirm, and send the swap
    Swap {
        /// Intent: <verb> <amount> <symbol>, e.g. "buy 10 USDC"
        #[arg(required = true, num_args = 1..)]
        intent: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Quote intents in a prompt loop and send on demand
    Interactive,
}

/// Flags merged over the optional settings file
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    network: String,
    rpc_url: Option<String>,
    keypair: Option<PathBuf>,
    pool: Pubkey,
    slippage_pct: f64,
}

fn resolve_settings(cli: &Cli, file: FileConfig) -> Result<Settings> {
    let pool = cli
        .pool
        .clone()
        .or(file.pool)
        .context("No pool given. Pass --pool <address> or set `pool` in the config file")?;
    let pool = pool
        .parse::<Pubkey>()
        .with_context(|| format!("Invalid pool address: {}", pool))?;

    Ok(Settings {
        network: cli
            .network
            .clone()
            .or(file.network)
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
        rpc_url: cli.url.clone().or(file.rpc_url),
        keypair: cli.keypair.clone().or(file.keypair),
        pool,
        slippage_pct: cli.slippage.or(file.slippage).unwrap_or(DEFAULT_SLIPPAGE_PCT),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = resolve_settings(&cli, file)?;

    // Initialize network configuration
    let config = NetworkConfig::new(&settings.network, settings.rpc_url.clone(), settings.keypair.clone())?;

    if cli.verbose {
        println!("{} {}", "Network:".bright_cyan(), config.network);
        println!("{} {}", "RPC URL:".bright_cyan(), config.rpc_url);
        println!("{} {}", "Keypair:".bright_cyan(), config.keypair_path.display());
        println!("{} {}", "Payer:".bright_cyan(), client::format_pubkey(&config.pubkey()));
        println!("{} {}", "Pool:".bright_cyan(), settings.pool);
    }

    let mut session = Session::open(config, &settings.pool, settings.slippage_pct).await?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    // Execute command
    match cli.command {
        Commands::Quote { intent } => {
            let quote = prompt::quote_with_mapping(&mut session, &intent.join(" "), &mut input, &mut output).await?;
            println!("{}", quote.report);
            quote.outcome?;
        }
        Commands::Swap { intent, yes } => {
            let quote = prompt::quote_with_mapping(&mut session, &intent.join(" "), &mut input, &mut output).await?;
            println!("{}", quote.report);
            let resolved = quote.outcome?;

            if !yes && !prompt::ask_yes_no(&mut input, &mut output, "Send this swap?")? {
                println!("{}", "Aborting...".yellow());
                return Ok(());
            }
            let summary = session.execute(&resolved).await?;
            println!("{}", summary.render(session.network()));
        }
        Commands::Interactive => {
            prompt::run_interactive(&mut session, &mut input, &mut output).await?;
        }
    }

    output.flush()?;
    Ok(())
}
