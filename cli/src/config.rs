//! Network configuration and keypair management

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::fs;
use std::path::{Path, PathBuf};

/// CP-swap program on devnet
pub const DEVNET_CP_SWAP_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("DRaycpLY18LhpbydsBWbVJtxpNv9oXPgjRSfpF2bWpYb");

/// CP-swap program on mainnet
pub const MAINNET_CP_SWAP_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C");

pub const DEFAULT_NETWORK: &str = "devnet";
pub const DEFAULT_SLIPPAGE_PCT: f64 = 0.5;

pub struct NetworkConfig {
    pub network: String,
    pub rpc_url: String,
    pub keypair: Keypair,
    pub keypair_path: PathBuf,
    pub cp_swap_program_id: Pubkey,
}

impl NetworkConfig {
    pub fn new(network: &str, rpc_url: Option<String>, keypair_path: Option<PathBuf>) -> Result<Self> {
        let (default_rpc, cp_swap_program_id) = network_defaults(network)?;
        let rpc_url = rpc_url.unwrap_or_else(|| default_rpc.to_string());

        let keypair_path = match keypair_path {
            Some(path) => expand_path(&path)?,
            None => default_keypair_path()?,
        };
        let keypair = load_keypair(&keypair_path)?;

        Ok(Self {
            network: network.to_string(),
            rpc_url,
            keypair,
            keypair_path,
            cp_swap_program_id,
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

/// Default RPC endpoint and CP-swap program id for a network name
pub fn network_defaults(network: &str) -> Result<(&'static str, Pubkey)> {
    match network {
        "devnet" => Ok(("https://api.devnet.solana.com", DEVNET_CP_SWAP_PROGRAM_ID)),
        "mainnet" | "mainnet-beta" => Ok((
            "https://api.mainnet-beta.solana.com",
            MAINNET_CP_SWAP_PROGRAM_ID,
        )),
        _ => anyhow::bail!("Unknown network: {}. Use devnet or mainnet", network),
    }
}

/// Optional settings file. Command line flags take precedence.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub keypair: Option<PathBuf>,
    pub pool: Option<String>,
    pub slippage: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let path = expand_path(path)?;
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path
        .to_str()
        .with_context(|| format!("Path is not valid UTF-8: {}", path.display()))?;
    let expanded = shellexpand::tilde(raw);
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Keypair from the Solana CLI config, else `~/.config/solana/id.json`
fn default_keypair_path() -> Result<PathBuf> {
    if let Some(config_file) = solana_cli_config::CONFIG_FILE.as_ref() {
        if let Ok(cli_config) = solana_cli_config::Config::load(config_file) {
            debug!("Using keypair from Solana CLI config {}", config_file);
            return expand_path(Path::new(&cli_config.keypair_path));
        }
    }

    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config/solana/id.json"))
}

/// Load a keypair from a JSON file
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    if !path.exists() {
        anyhow::bail!(
            "Keypair file not found: {}\n\
             Create one with: solana-keygen new --outfile {}",
            path.display(),
            path.display()
        );
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read keypair file: {}", path.display()))?;

    let bytes: Vec<u8> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse keypair JSON: {}", path.display()))?;

    Keypair::from_bytes(&bytes)
        .with_context(|| format!("Invalid keypair data in: {}", path.display()))
}
