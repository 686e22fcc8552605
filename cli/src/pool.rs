//! CP-swap pool and AMM config accounts

use anyhow::{Context, Result};
use log::{debug, warn};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;

use crate::cp_swap::account_discriminator;
use crate::intent::PoolAccounts;

const DISCRIMINATOR_LEN: usize = 8;

/// Bit in `PoolState::status` that disables swaps
const STATUS_SWAP_DISABLED: u8 = 1 << 2;

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut raw = [0u8; 32];
    raw.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(raw)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

fn check_header(data: &[u8], name: &str, min_len: usize) -> Result<()> {
    if data.len() < min_len {
        anyhow::bail!(
            "{} account too short: {} bytes, expected at least {}",
            name,
            data.len(),
            min_len
        );
    }
    if data[..DISCRIMINATOR_LEN] != account_discriminator(name) {
        anyhow::bail!("Account is not a CP-swap {}", name);
    }
    Ok(())
}

/// Decoded `PoolState`, up to and including `lp_supply`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub amm_config: Pubkey,
    pub pool_creator: Pubkey,
    pub token_0_vault: Pubkey,
    pub token_1_vault: Pubkey,
    pub lp_mint: Pubkey,
    pub token_0_mint: Pubkey,
    pub token_1_mint: Pubkey,
    pub token_0_program: Pubkey,
    pub token_1_program: Pubkey,
    pub observation_key: Pubkey,
    pub auth_bump: u8,
    pub status: u8,
    pub lp_mint_decimals: u8,
    pub mint_0_decimals: u8,
    pub mint_1_decimals: u8,
    pub lp_supply: u64,
}

impl PoolState {
    /// discriminator + 10 pubkeys + 5 u8 + lp_supply
    pub const MIN_LEN: usize = DISCRIMINATOR_LEN + 10 * 32 + 5 + 8;

    pub fn parse(data: &[u8]) -> Result<Self> {
        check_header(data, "PoolState", Self::MIN_LEN)?;
        let key = |i: usize| read_pubkey(data, DISCRIMINATOR_LEN + i * 32);
        let tail = DISCRIMINATOR_LEN + 10 * 32;

        Ok(Self {
            amm_config: key(0),
            pool_creator: key(1),
            token_0_vault: key(2),
            token_1_vault: key(3),
            lp_mint: key(4),
            token_0_mint: key(5),
            token_1_mint: key(6),
            token_0_program: key(7),
            token_1_program: key(8),
            observation_key: key(9),
            auth_bump: data[tail],
            status: data[tail + 1],
            lp_mint_decimals: data[tail + 2],
            mint_0_decimals: data[tail + 3],
            mint_1_decimals: data[tail + 4],
            lp_supply: read_u64(data, tail + 5),
        })
    }

    pub fn swap_enabled(&self) -> bool {
        self.status & STATUS_SWAP_DISABLED == 0
    }
}

/// Decoded `AmmConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmConfig {
    pub bump: u8,
    pub disable_create_pool: bool,
    pub index: u16,
    /// Parts per million of the input amount
    pub trade_fee_rate: u64,
    pub protocol_fee_rate: u64,
    pub fund_fee_rate: u64,
    pub create_pool_fee: u64,
}

impl AmmConfig {
    pub const MIN_LEN: usize = DISCRIMINATOR_LEN + 1 + 1 + 2 + 4 * 8;

    pub fn parse(data: &[u8]) -> Result<Self> {
        check_header(data, "AmmConfig", Self::MIN_LEN)?;
        let d = DISCRIMINATOR_LEN;
        Ok(Self {
            bump: data[d],
            disable_create_pool: data[d + 1] != 0,
            index: u16::from_le_bytes([data[d + 2], data[d + 3]]),
            trade_fee_rate: read_u64(data, d + 4),
            protocol_fee_rate: read_u64(data, d + 12),
            fund_fee_rate: read_u64(data, d + 20),
            create_pool_fee: read_u64(data, d + 28),
        })
    }
}

/// One side of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLeg {
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub program: Pubkey,
}

/// Everything the resolver needs to know about a pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInfo {
    pub address: Pubkey,
    pub amm_config: Pubkey,
    pub observation: Pubkey,
    pub program_id: Pubkey,
    pub legs: [PoolLeg; 2],
    pub trade_fee_rate: u64,
}

impl PoolInfo {
    pub fn from_state(address: Pubkey, program_id: Pubkey, state: &PoolState, config: &AmmConfig) -> Self {
        Self {
            address,
            amm_config: state.amm_config,
            observation: state.observation_key,
            program_id,
            legs: [
                PoolLeg {
                    mint: state.token_0_mint,
                    vault: state.token_0_vault,
                    program: state.token_0_program,
                },
                PoolLeg {
                    mint: state.token_1_mint,
                    vault: state.token_1_vault,
                    program: state.token_1_program,
                },
            ],
            trade_fee_rate: config.trade_fee_rate,
        }
    }

    pub fn mints(&self) -> [Pubkey; 2] {
        [self.legs[0].mint, self.legs[1].mint]
    }

    /// Index of the leg holding `mint`
    pub fn leg_index(&self, mint: &Pubkey) -> Option<usize> {
        self.legs.iter().position(|leg| leg.mint == *mint)
    }

    pub fn accounts(&self) -> PoolAccounts {
        PoolAccounts {
            address: self.address,
            amm_config: self.amm_config,
            observation: self.observation,
            program_id: self.program_id,
        }
    }
}

/// Fetch and decode a pool and its AMM config
pub async fn load_pool(rpc: &RpcClient, address: &Pubkey, program_id: &Pubkey) -> Result<PoolInfo> {
    let account = rpc
        .get_account(address)
        .await
        .with_context(|| format!("Failed to get pool account: {}", address))?;
    if account.owner != *program_id {
        anyhow::bail!(
            "Pool {} is owned by {}, not the CP-swap program {}",
            address,
            account.owner,
            program_id
        );
    }
    let state = PoolState::parse(&account.data)
        .with_context(|| format!("Failed to parse pool state: {}", address))?;
    if !state.swap_enabled() {
        warn!("Pool {} has swaps disabled (status {:#04x})", address, state.status);
    }

    let config_account = rpc
        .get_account(&state.amm_config)
        .await
        .with_context(|| format!("Failed to get AMM config: {}", state.amm_config))?;
    let config = AmmConfig::parse(&config_account.data)
        .with_context(|| format!("Failed to parse AMM config: {}", state.amm_config))?;
    debug!(
        "Pool {} config {} trade fee {} ppm",
        address, state.amm_config, config.trade_fee_rate
    );

    Ok(PoolInfo::from_state(*address, *program_id, &state, &config))
}
