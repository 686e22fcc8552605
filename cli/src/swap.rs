//! Swap transaction assembly, submission and confirmation

use std::time::{Duration, Instant};

use amm_model::BigUint;
use anyhow::{Context, Result};
use chrono::DateTime;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use num_traits::ToPrimitive;
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::Signature,
    system_instruction,
    transaction::Transaction,
};
use solana_transaction_status::{
    TransactionConfirmationStatus, UiTransactionEncoding, UiTransactionTokenBalance,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};

use crate::config::NetworkConfig;
use crate::cp_swap;
use crate::intent::ResolvedIntent;
use crate::report::TxSummary;
use crate::symbols::SymbolDirectory;

pub const COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Micro-lamports per compute unit
pub const COMPUTE_UNIT_PRICE: u64 = 5_000;

const CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wrapped SOL mint
pub const NATIVE_MINT: Pubkey = solana_sdk::pubkey!("So11111111111111111111111111111111111111112");

pub fn is_native_mint(mint: &Pubkey) -> bool {
    *mint == NATIVE_MINT
}

/// Payer token account for one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountState {
    pub address: Pubkey,
    pub exists: bool,
    /// Current balance in base units, zero when the account is missing
    pub balance: u64,
}

/// Instructions of a swap transaction and the accounts they touch
#[derive(Debug, Clone, PartialEq)]
pub struct SwapPlan {
    pub instructions: Vec<Instruction>,
    pub input_account: Pubkey,
    pub output_account: Pubkey,
    pub input_account_created: bool,
}

/// Lamports to move into the wSOL account before the swap
pub fn wrap_deficit(required: &BigUint, existing: u64) -> Result<Option<u64>> {
    let existing = BigUint::from(existing);
    if *required <= existing {
        return Ok(None);
    }
    let deficit = required - existing;
    deficit
        .to_u64()
        .map(Some)
        .context("Wrap deficit exceeds u64")
}

/// Order: compute budget, ATA creation, wSOL wrap, swap, wSOL close.
pub fn assemble_swap(
    payer: &Pubkey,
    intent: &ResolvedIntent,
    input: TokenAccountState,
    output: TokenAccountState,
) -> Result<SwapPlan> {
    let mut instructions = vec![
        ComputeBudgetInstruction::set_compute_unit_limit(COMPUTE_UNIT_LIMIT),
        ComputeBudgetInstruction::set_compute_unit_price(COMPUTE_UNIT_PRICE),
    ];

    for (state, leg) in [(&input, &intent.token_in), (&output, &intent.token_out)] {
        if !state.exists {
            instructions.push(create_associated_token_account_idempotent(
                payer,
                payer,
                &leg.mint,
                &leg.program,
            ));
        }
    }

    let native_input = is_native_mint(&intent.token_in.mint);
    if native_input {
        let required = intent
            .required_input_amount()
            .context("Required input amount missing for swap")?;
        if let Some(lamports) = wrap_deficit(&required, input.balance)? {
            debug!("Wrapping {} lamports into {}", lamports, input.address);
            instructions.push(system_instruction::transfer(payer, &input.address, lamports));
            instructions.push(spl_token::instruction::sync_native(
                &intent.token_in.program,
                &input.address,
            )?);
        }
    }

    let authority = cp_swap::authority_address(&intent.pool.program_id);
    instructions.push(intent.build_swap_instruction(
        payer,
        &authority,
        &input.address,
        &output.address,
    )?);

    // Never close the output account
    if native_input && !input.exists {
        instructions.push(spl_token::instruction::close_account(
            &intent.token_in.program,
            &input.address,
            payer,
            payer,
            &[],
        )?);
    }

    Ok(SwapPlan {
        instructions,
        input_account: input.address,
        output_account: output.address,
        input_account_created: !input.exists,
    })
}

async fn token_account_state(
    rpc: &RpcClient,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Result<TokenAccountState> {
    let address = get_associated_token_address_with_program_id(owner, mint, token_program);
    let account = rpc
        .get_account_with_commitment(&address, CommitmentConfig::processed())
        .await
        .with_context(|| format!("Failed to get token account: {}", address))?
        .value;

    let Some(account) = account else {
        return Ok(TokenAccountState {
            address,
            exists: false,
            balance: 0,
        });
    };
    let balance = if is_native_mint(mint) {
        spl_token::state::Account::unpack(&account.data)
            .with_context(|| format!("Failed to decode wSOL account: {}", address))?
            .amount
    } else {
        0
    };
    Ok(TokenAccountState {
        address,
        exists: true,
        balance,
    })
}

/// Look up the payer's token accounts and assemble the swap
pub async fn plan_swap(rpc: &RpcClient, payer: &Pubkey, intent: &ResolvedIntent) -> Result<SwapPlan> {
    let (input, output) = futures::try_join!(
        token_account_state(rpc, payer, &intent.token_in.mint, &intent.token_in.program),
        token_account_state(rpc, payer, &intent.token_out.mint, &intent.token_out.program),
    )?;
    assemble_swap(payer, intent, input, output)
}

/// Token balance entry from transaction metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: Pubkey,
    pub amount: BigUint,
    pub decimals: u8,
}

impl TokenBalance {
    fn from_ui(balance: &UiTransactionTokenBalance) -> Option<Self> {
        Some(Self {
            account_index: balance.account_index,
            mint: balance.mint.parse().ok()?,
            amount: balance.ui_token_amount.amount.parse().ok()?,
            decimals: balance.ui_token_amount.decimals,
        })
    }
}

fn find_balance<'a>(balances: &'a [TokenBalance], index: usize, mint: &Pubkey) -> Option<&'a TokenBalance> {
    balances
        .iter()
        .find(|b| b.account_index as usize == index && b.mint == *mint)
}

/// Absolute change of `account`'s `mint` balance across a transaction
pub fn token_delta(
    account_keys: &[Pubkey],
    pre: &[TokenBalance],
    post: &[TokenBalance],
    account: &Pubkey,
    mint: &Pubkey,
) -> Option<(BigUint, u8)> {
    let index = account_keys.iter().position(|key| key == account)?;
    let before = find_balance(pre, index, mint);
    let after = find_balance(post, index, mint);
    let decimals = before.or(after)?.decimals;

    let zero = BigUint::default();
    let before = before.map_or(&zero, |b| &b.amount);
    let after = after.map_or(&zero, |b| &b.amount);
    let delta = if after >= before { after - before } else { before - after };
    Some((delta, decimals))
}

/// Sign, send and wait for confirmation
pub async fn execute_swap(
    config: &NetworkConfig,
    rpc: &RpcClient,
    intent: &ResolvedIntent,
    directory: &SymbolDirectory,
) -> Result<TxSummary> {
    let payer = config.pubkey();
    let plan = plan_swap(rpc, &payer, intent).await?;
    if plan.input_account_created {
        info!("Creating input token account {}", plan.input_account);
    }

    let recent_blockhash = rpc
        .get_latest_blockhash()
        .await
        .context("Failed to get recent blockhash")?;
    let transaction = Transaction::new_signed_with_payer(
        &plan.instructions,
        Some(&payer),
        &[&config.keypair],
        recent_blockhash,
    );

    println!("{}", "Sending transaction...".dimmed());
    let signature = rpc
        .send_transaction(&transaction)
        .await
        .context("Failed to send transaction")?;
    info!("Sent swap transaction {}", signature);

    let status = wait_for_confirmation(rpc, &signature).await;
    let mut summary = TxSummary {
        signature,
        status,
        block_time: None,
        fee_lamports: None,
        paid: None,
        paid_decimals: intent.token_in.decimals,
        paid_symbol: directory.display_symbol(&intent.token_in.mint),
        received: None,
        received_decimals: intent.token_out.decimals,
        received_symbol: directory.display_symbol(&intent.token_out.mint),
    };

    match fetch_balances(rpc, &signature).await {
        Ok(Some(details)) => {
            let TxDetails { fee, block_time, pre, post } = details;
            let keys = &transaction.message.account_keys;
            summary.fee_lamports = Some(fee);
            summary.block_time = block_time.and_then(|secs| DateTime::from_timestamp(secs, 0));
            if let Some((paid, decimals)) =
                token_delta(keys, &pre, &post, &intent.token_in.vault, &intent.token_in.mint)
            {
                summary.paid = Some(paid);
                summary.paid_decimals = decimals;
            }
            if let Some((received, decimals)) =
                token_delta(keys, &pre, &post, &intent.token_out.vault, &intent.token_out.mint)
            {
                summary.received = Some(received);
                summary.received_decimals = decimals;
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Failed to fetch transaction {}: {:#}", signature, e),
    }

    Ok(summary)
}

/// Poll signature status until confirmed, failed or timed out
async fn wait_for_confirmation(rpc: &RpcClient, signature: &Signature) -> String {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Waiting for confirmation of {}", signature));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let started = Instant::now();
    let mut status = "pending".to_string();
    while started.elapsed() < CONFIRM_TIMEOUT {
        match rpc.get_signature_statuses(&[*signature]).await {
            Ok(response) => {
                if let Some(Some(tx_status)) = response.value.first() {
                    if tx_status.err.is_some() {
                        status = "failed".to_string();
                        break;
                    }
                    match tx_status.confirmation_status {
                        Some(TransactionConfirmationStatus::Finalized) => {
                            status = "finalized".to_string();
                            break;
                        }
                        Some(TransactionConfirmationStatus::Confirmed) => {
                            status = "confirmed".to_string();
                            break;
                        }
                        Some(TransactionConfirmationStatus::Processed) => {
                            status = "processed".to_string();
                        }
                        None => {}
                    }
                }
            }
            Err(e) => debug!("Signature status query failed: {}", e),
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    spinner.finish_and_clear();
    if status == "pending" || status == "processed" {
        warn!("Transaction {} not confirmed after {:?}", signature, CONFIRM_TIMEOUT);
    }
    status
}

/// Fee, block time and vault balances of a landed transaction
struct TxDetails {
    fee: u64,
    block_time: Option<i64>,
    pre: Vec<TokenBalance>,
    post: Vec<TokenBalance>,
}

async fn fetch_balances(rpc: &RpcClient, signature: &Signature) -> Result<Option<TxDetails>> {
    let config = RpcTransactionConfig {
        encoding: Some(UiTransactionEncoding::Base64),
        commitment: Some(CommitmentConfig::confirmed()),
        max_supported_transaction_version: Some(0),
    };
    let tx = rpc
        .get_transaction_with_config(signature, config)
        .await
        .context("getTransaction failed")?;
    let block_time = tx.block_time;
    let Some(meta) = tx.transaction.meta else {
        return Ok(None);
    };

    let convert = |balances: Option<Vec<UiTransactionTokenBalance>>| -> Vec<TokenBalance> {
        balances
            .unwrap_or_default()
            .iter()
            .filter_map(TokenBalance::from_ui)
            .collect()
    };
    let pre = convert(meta.pre_token_balances.into());
    let post = convert(meta.post_token_balances.into());
    Ok(Some(TxDetails {
        fee: meta.fee,
        block_time,
        pre,
        post,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::resolve_intent;
    use crate::pool::tests::sample_pool;
    use crate::pool::PoolInfo;
    use amm_model::{ReserveSnapshot, SlippageRatio};

    fn reserves() -> Vec<ReserveSnapshot> {
        vec![
            ReserveSnapshot::new(1_000_000_000_000u64, 9),
            ReserveSnapshot::new(2_000_000_000u64, 6),
        ]
    }

    /// Pool whose leg 0 is wrapped SOL on the legacy token program
    fn native_pool() -> PoolInfo {
        let mut pool = sample_pool(2500);
        pool.legs[0].mint = NATIVE_MINT;
        pool.legs[0].program = spl_token::id();
        pool.legs[1].program = spl_token::id();
        pool
    }

    fn resolve(pool: &PoolInfo, line: &str) -> ResolvedIntent {
        let mut directory = SymbolDirectory::default();
        directory.record(pool.legs[0].mint, "SOL");
        directory.record(pool.legs[1].mint, "USDC");
        resolve_intent(line, pool, &directory, &reserves(), &SlippageRatio::zero()).unwrap()
    }

    fn account(exists: bool, balance: u64) -> TokenAccountState {
        TokenAccountState {
            address: Pubkey::new_unique(),
            exists,
            balance,
        }
    }

    #[test]
    fn test_wrap_deficit() {
        let required = BigUint::from(1_000u32);
        assert_eq!(wrap_deficit(&required, 0).unwrap(), Some(1_000));
        assert_eq!(wrap_deficit(&required, 400).unwrap(), Some(600));
        assert_eq!(wrap_deficit(&required, 1_000).unwrap(), None);
        assert_eq!(wrap_deficit(&required, 5_000).unwrap(), None);

        let huge = BigUint::from(u64::MAX) * 2u32;
        assert!(wrap_deficit(&huge, 0).is_err());
    }

    #[test]
    fn test_assemble_existing_accounts() {
        let pool = native_pool();
        let intent = resolve(&pool, "pay 10 USDC");
        let payer = Pubkey::new_unique();

        let plan = assemble_swap(&payer, &intent, account(true, 0), account(true, 0)).unwrap();
        // compute limit, compute price, swap
        assert_eq!(plan.instructions.len(), 3);
        assert_eq!(plan.instructions[2].program_id, pool.program_id);
        assert!(!plan.input_account_created);
    }

    #[test]
    fn test_assemble_creates_missing_accounts() {
        let pool = native_pool();
        let intent = resolve(&pool, "pay 10 USDC");
        let payer = Pubkey::new_unique();

        let plan = assemble_swap(&payer, &intent, account(false, 0), account(false, 0)).unwrap();
        assert_eq!(plan.instructions.len(), 5);
        assert_eq!(plan.instructions[2].program_id, spl_associated_token_account::id());
        assert_eq!(plan.instructions[3].program_id, spl_associated_token_account::id());
        // USDC input is not wrapped, so nothing is closed
        assert_eq!(plan.instructions[4].program_id, pool.program_id);
        assert!(plan.input_account_created);
    }

    #[test]
    fn test_assemble_wraps_and_closes_new_wsol_account() {
        let pool = native_pool();
        let intent = resolve(&pool, "sell 1 SOL");
        let payer = Pubkey::new_unique();
        let input = account(false, 0);

        let plan = assemble_swap(&payer, &intent, input, account(true, 0)).unwrap();
        let compute_budget = ComputeBudgetInstruction::set_compute_unit_limit(1).program_id;
        let programs: Vec<Pubkey> = plan.instructions.iter().map(|ix| ix.program_id).collect();
        assert_eq!(
            programs,
            vec![
                compute_budget,
                compute_budget,
                spl_associated_token_account::id(),
                solana_sdk::system_program::id(),
                spl_token::id(),
                pool.program_id,
                spl_token::id(),
            ]
        );

        let transfer = &plan.instructions[3];
        assert_eq!(transfer.accounts[1].pubkey, input.address);
        assert_eq!(&transfer.data[4..12], &1_000_000_000u64.to_le_bytes());

        let close = plan.instructions.last().unwrap();
        assert_eq!(close.accounts[0].pubkey, input.address);
        assert_eq!(close.accounts[1].pubkey, payer);
    }

    #[test]
    fn test_assemble_existing_wsol_tops_up_without_close() {
        let pool = native_pool();
        let intent = resolve(&pool, "sell 1 SOL");
        let payer = Pubkey::new_unique();

        let funded = assemble_swap(&payer, &intent, account(true, 2_000_000_000), account(true, 0)).unwrap();
        assert_eq!(funded.instructions.len(), 3);

        let partial = assemble_swap(&payer, &intent, account(true, 400_000_000), account(true, 0)).unwrap();
        assert_eq!(partial.instructions.len(), 5);
        assert_eq!(&partial.instructions[2].data[4..12], &600_000_000u64.to_le_bytes());
        assert_eq!(partial.instructions.last().unwrap().program_id, pool.program_id);
    }

    #[test]
    fn test_token_delta() {
        let vault = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let keys = vec![Pubkey::new_unique(), vault];
        let entry = |amount: u64| TokenBalance {
            account_index: 1,
            mint,
            amount: BigUint::from(amount),
            decimals: 6,
        };

        let (delta, decimals) = token_delta(&keys, &[entry(1_000)], &[entry(1_250)], &vault, &mint).unwrap();
        assert_eq!(delta, BigUint::from(250u32));
        assert_eq!(decimals, 6);

        let (delta, _) = token_delta(&keys, &[entry(1_000)], &[entry(900)], &vault, &mint).unwrap();
        assert_eq!(delta, BigUint::from(100u32));

        let (delta, _) = token_delta(&keys, &[], &[entry(42)], &vault, &mint).unwrap();
        assert_eq!(delta, BigUint::from(42u32));

        assert!(token_delta(&keys, &[], &[], &vault, &mint).is_none());
        assert!(token_delta(&keys, &[entry(1)], &[entry(2)], &Pubkey::new_unique(), &mint).is_none());
        assert!(token_delta(&keys, &[entry(1)], &[entry(2)], &vault, &Pubkey::new_unique()).is_none());
    }
}
