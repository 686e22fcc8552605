//! A trading session against one pool

use amm_model::{slippage_ratio, ReserveSnapshot, SlippageRatio};
use anyhow::{Context, Result};
use log::{error, info};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;

use crate::client::{create_blocking_client, create_rpc_client, fetch_pool_reserves, RpcAccountSource};
use crate::config::NetworkConfig;
use crate::intent::{resolve_intent, IntentError, ResolvedIntent};
use crate::pool::{load_pool, PoolInfo};
use crate::report::{PoolReport, TxSummary};
use crate::swap::execute_swap;
use crate::symbols::SymbolDirectory;

/// Rendered report plus the resolution it describes
pub struct Quote {
    pub report: String,
    pub outcome: Result<ResolvedIntent, IntentError>,
}

pub struct Session {
    config: NetworkConfig,
    rpc: RpcClient,
    pub pool: PoolInfo,
    directory: SymbolDirectory,
    slippage_pct: f64,
    slippage: SlippageRatio,
}

impl Session {
    /// Load the pool, its fee config and leg symbols
    pub async fn open(config: NetworkConfig, pool_address: &Pubkey, slippage_pct: f64) -> Result<Self> {
        let slippage = slippage_ratio(slippage_pct).context("Invalid slippage")?;
        let rpc = create_rpc_client(&config);
        let pool = load_pool(&rpc, pool_address, &config.cp_swap_program_id).await?;

        let blocking = create_blocking_client(&config);
        let directory = SymbolDirectory::build(&RpcAccountSource::new(&blocking), &pool.mints());
        info!(
            "Opened pool {} ({} / {})",
            pool.address,
            directory.display_symbol(&pool.legs[0].mint),
            directory.display_symbol(&pool.legs[1].mint)
        );

        Ok(Self::with_parts(config, rpc, pool, directory, slippage_pct, slippage))
    }

    fn with_parts(
        config: NetworkConfig,
        rpc: RpcClient,
        pool: PoolInfo,
        directory: SymbolDirectory,
        slippage_pct: f64,
        slippage: SlippageRatio,
    ) -> Self {
        Self {
            config,
            rpc,
            pool,
            directory,
            slippage_pct,
            slippage,
        }
    }

    pub fn network(&self) -> &str {
        &self.config.network
    }

    pub fn directory(&self) -> &SymbolDirectory {
        &self.directory
    }

    pub fn slippage_pct(&self) -> f64 {
        self.slippage_pct
    }

    /// Rejects values outside [0, 100) and keeps the old tolerance
    pub fn set_slippage(&mut self, pct: f64) -> Result<()> {
        self.slippage = slippage_ratio(pct)?;
        self.slippage_pct = pct;
        Ok(())
    }

    /// Record a user-confirmed symbol for `mint`
    pub fn map_symbol(&mut self, symbol: &str, mint: Pubkey) {
        info!("Mapping symbol {} to mint {}", symbol, mint);
        self.directory.map_symbol(symbol, mint);
    }

    /// Resolve `line` against freshly fetched reserves. A failed reserve
    /// fetch is returned as the error, never quoted.
    pub async fn quote(&self, line: &str) -> Result<Quote> {
        let fetched = fetch_pool_reserves(&self.rpc, &self.pool).await;
        self.quote_fetched(line, fetched)
    }

    fn quote_fetched(&self, line: &str, fetched: Result<Vec<ReserveSnapshot>>) -> Result<Quote> {
        let reserves = fetched
            .with_context(|| format!("Failed to fetch reserves for pool {}", self.pool.address))
            .map_err(|e| {
                error!("{:#}", e);
                e
            })?;
        Ok(self.quote_with_reserves(line, &reserves))
    }

    pub fn quote_with_reserves(&self, line: &str, reserves: &[ReserveSnapshot]) -> Quote {
        let outcome = resolve_intent(line, &self.pool, &self.directory, reserves, &self.slippage);
        let report = PoolReport {
            pool: &self.pool,
            directory: &self.directory,
            reserves,
            slippage_pct: self.slippage_pct,
        }
        .render(Some(&outcome));
        Quote { report, outcome }
    }

    pub async fn execute(&self, intent: &ResolvedIntent) -> Result<TxSummary> {
        execute_swap(&self.config, &self.rpc, intent, &self.directory).await
    }
}
