//! Solana RPC client utilities and helpers

use std::fmt;

use amm_model::{BigUint, ReserveSnapshot};
use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;
use solana_client::{nonblocking, rpc_client};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature};
use token_metadata::{AccountData, AccountSource, MetadataError};

use crate::config::NetworkConfig;
use crate::pool::PoolInfo;

/// Create the async RPC client from the network configuration
pub fn create_rpc_client(config: &NetworkConfig) -> nonblocking::rpc_client::RpcClient {
    nonblocking::rpc_client::RpcClient::new_with_commitment(
        config.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    )
}

/// Blocking client used for metadata lookups
pub fn create_blocking_client(config: &NetworkConfig) -> rpc_client::RpcClient {
    rpc_client::RpcClient::new_with_commitment(
        config.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    )
}

/// Account reader for metadata decoding, backed by RPC
pub struct RpcAccountSource<'a> {
    client: &'a rpc_client::RpcClient,
}

impl<'a> RpcAccountSource<'a> {
    pub fn new(client: &'a rpc_client::RpcClient) -> Self {
        Self { client }
    }
}

impl AccountSource for RpcAccountSource<'_> {
    fn fetch_account(&self, address: &Pubkey) -> token_metadata::Result<Option<AccountData>> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::processed())
            .map_err(|e| MetadataError::Fetch {
                address: *address,
                reason: e.to_string(),
            })?;

        Ok(response.value.map(|account| AccountData {
            owner: account.owner,
            data: account.data,
        }))
    }
}

/// Read both vault balances concurrently. Either failure fails the fetch.
pub async fn fetch_pool_reserves(
    rpc: &nonblocking::rpc_client::RpcClient,
    pool: &PoolInfo,
) -> Result<Vec<ReserveSnapshot>> {
    let (reserve0, reserve1) = futures::try_join!(
        vault_reserve(rpc, &pool.legs[0].vault),
        vault_reserve(rpc, &pool.legs[1].vault),
    )?;
    debug!(
        "Pool {} reserves: {} / {}",
        pool.address, reserve0.balance, reserve1.balance
    );
    Ok(vec![reserve0, reserve1])
}

async fn vault_reserve(
    rpc: &nonblocking::rpc_client::RpcClient,
    vault: &Pubkey,
) -> Result<ReserveSnapshot> {
    let balance = rpc
        .get_token_account_balance(vault)
        .await
        .with_context(|| format!("Failed to get vault balance: {}", vault))?;
    parse_reserve(&balance.amount, balance.decimals)
        .with_context(|| format!("Invalid vault balance for {}", vault))
}

/// Raw token amount string as reported by the ledger
pub fn parse_reserve(amount: &str, decimals: u8) -> Result<ReserveSnapshot> {
    let balance: BigUint = amount
        .parse()
        .with_context(|| format!("Token amount is not an integer: {:?}", amount))?;
    Ok(ReserveSnapshot::new(balance, decimals))
}

/// Address truncated in the middle: `head…tail`
#[derive(Debug, Clone, Copy)]
pub struct Addr<'a>(pub &'a Pubkey);

impl fmt::Display for Addr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const HEAD: usize = 6;
        const TAIL: usize = 6;

        let addr = self.0.to_string();
        if addr.len() <= HEAD + TAIL {
            return write!(f, "{}", addr);
        }
        write!(f, "{}…{}", &addr[..HEAD], &addr[addr.len() - TAIL..])
    }
}

/// Explorer link for a transaction
pub fn explorer_url(signature: &Signature, network: &str) -> String {
    match network {
        "mainnet-beta" | "mainnet" => format!("https://explorer.solana.com/tx/{}", signature),
        "devnet" => format!("https://explorer.solana.com/tx/{}?cluster=devnet", signature),
        _ => signature.to_string(),
    }
}

/// Pretty print a signature as a shortened explorer link
pub fn format_signature(signature: &Signature, network: &str) -> String {
    let sig_str = signature.to_string();
    let short = format!("{}...{}", &sig_str[0..8], &sig_str[sig_str.len() - 8..]);
    format!(
        "{} ({})",
        short.bright_blue(),
        explorer_url(signature, network).dimmed()
    )
}

/// Pretty print a pubkey as shortened address
pub fn format_pubkey(pubkey: &Pubkey) -> String {
    Addr(pubkey).to_string().bright_yellow().to_string()
}
