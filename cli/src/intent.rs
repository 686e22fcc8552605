//! Intent parsing and resolution
//!
//! An intent is `<verb> <amount> <symbol>`. The amount is always in units of
//! the token the user named:
//!
//! | verb                 | user names       | swap kind  | bound          |
//! |----------------------|------------------|------------|----------------|
//! | `pay`, `sell`, `swap`| what they give   | BaseInput  | min amount out |
//! | `buy`, `get`         | what they want   | BaseOutput | max amount in  |

use std::fmt;

use amm_model::{
    apply_ceil, apply_floor, to_base_units, AmmError, BigUint, ConstantProduct, ReserveSnapshot,
    SlippageRatio,
};
use log::debug;
use num_traits::ToPrimitive;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use thiserror::Error;

use crate::client::Addr;
use crate::cp_swap::{self, SwapAccounts};
use crate::pool::PoolInfo;
use crate::symbols::SymbolDirectory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
    #[error("intent must be <verb> <amount> <token-symbol>, got {0:?}")]
    MalformedIntent(String),

    #[error("unknown verb {0:?}; use pay, sell, swap, buy or get")]
    UnknownVerb(String),

    #[error("unknown token symbol {symbol} (available: {})", .available.join(", "))]
    UnknownSymbol { symbol: String, available: Vec<String> },

    #[error("unknown token symbol {symbol}; map to mint {}?", Addr(.candidate_mint))]
    MissingSymbolMapping { symbol: String, candidate_mint: Pubkey },

    #[error("missing balance information for pool legs")]
    IncompleteReserveData,

    #[error("{0} intent missing amounts")]
    MissingAmount(SwapKind),

    #[error("amounts exceed u64 range required by the program")]
    AmountOverflow,

    #[error(transparent)]
    Amm(#[from] AmmError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Amount is what the user gives up
    Sell,
    /// Amount is what the user receives
    Buy,
}

impl Direction {
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb.to_ascii_lowercase().as_str() {
            "pay" | "sell" | "swap" => Some(Direction::Sell),
            "buy" | "get" => Some(Direction::Buy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKind {
    BaseInput,
    BaseOutput,
}

impl fmt::Display for SwapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapKind::BaseInput => write!(f, "swap base input"),
            SwapKind::BaseOutput => write!(f, "swap base output"),
        }
    }
}

/// Parsed `<verb> <amount> <symbol>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentInstruction {
    pub verb: String,
    pub amount: String,
    pub direction: Direction,
    pub target_symbol: String,
}

impl fmt::Display for IntentInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.verb, self.amount, self.target_symbol)
    }
}

pub fn parse_intent(line: &str) -> Result<IntentInstruction, IntentError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [verb, amount, symbol] = tokens.as_slice() else {
        return Err(IntentError::MalformedIntent(line.trim().to_string()));
    };
    let direction =
        Direction::from_verb(verb).ok_or_else(|| IntentError::UnknownVerb(verb.to_string()))?;

    Ok(IntentInstruction {
        verb: verb.to_string(),
        amount: amount.to_string(),
        direction,
        target_symbol: symbol.to_uppercase(),
    })
}

/// One side of a resolved swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapLeg {
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub program: Pubkey,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapAmounts {
    /// Amount the user typed, in base units of the token they named
    pub known_amount: BigUint,
    /// Curve counter amount before slippage
    pub quote_amount: BigUint,
    /// Set for BaseInput
    pub min_amount_out: Option<BigUint>,
    /// Set for BaseOutput
    pub max_amount_in: Option<BigUint>,
}

/// Accounts tying an intent to a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAccounts {
    pub address: Pubkey,
    pub amm_config: Pubkey,
    pub observation: Pubkey,
    pub program_id: Pubkey,
}

/// A fully computed, transaction-ready swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIntent {
    pub instruction: IntentInstruction,
    pub kind: SwapKind,
    pub amounts: SwapAmounts,
    pub token_in: SwapLeg,
    pub token_out: SwapLeg,
    pub pool: PoolAccounts,
}

impl ResolvedIntent {
    /// Amount the payer's input account must hold
    pub fn required_input_amount(&self) -> Option<BigUint> {
        match self.kind {
            SwapKind::BaseInput => Some(self.amounts.known_amount.clone()),
            SwapKind::BaseOutput => self.amounts.max_amount_in.clone(),
        }
    }

    /// The leg the user did not name
    pub fn counter_leg(&self) -> &SwapLeg {
        match self.kind {
            SwapKind::BaseInput => &self.token_out,
            SwapKind::BaseOutput => &self.token_in,
        }
    }

    /// The leg the user named
    pub fn target_leg(&self) -> &SwapLeg {
        match self.kind {
            SwapKind::BaseInput => &self.token_in,
            SwapKind::BaseOutput => &self.token_out,
        }
    }

    pub fn build_swap_instruction(
        &self,
        payer: &Pubkey,
        authority: &Pubkey,
        input_account: &Pubkey,
        output_account: &Pubkey,
    ) -> Result<Instruction, IntentError> {
        let accounts = SwapAccounts {
            payer: *payer,
            authority: *authority,
            amm_config: self.pool.amm_config,
            pool_state: self.pool.address,
            input_token_account: *input_account,
            output_token_account: *output_account,
            input_vault: self.token_in.vault,
            output_vault: self.token_out.vault,
            input_token_program: self.token_in.program,
            output_token_program: self.token_out.program,
            input_token_mint: self.token_in.mint,
            output_token_mint: self.token_out.mint,
            observation_state: self.pool.observation,
        };
        let known = to_u64(&self.amounts.known_amount)?;

        match self.kind {
            SwapKind::BaseInput => {
                let min_out = self
                    .amounts
                    .min_amount_out
                    .as_ref()
                    .ok_or(IntentError::MissingAmount(self.kind))?;
                Ok(cp_swap::swap_base_input(
                    &self.pool.program_id,
                    &accounts,
                    known,
                    to_u64(min_out)?,
                ))
            }
            SwapKind::BaseOutput => {
                let max_in = self
                    .amounts
                    .max_amount_in
                    .as_ref()
                    .ok_or(IntentError::MissingAmount(self.kind))?;
                Ok(cp_swap::swap_base_output(
                    &self.pool.program_id,
                    &accounts,
                    to_u64(max_in)?,
                    known,
                ))
            }
        }
    }
}

fn to_u64(amount: &BigUint) -> Result<u64, IntentError> {
    amount.to_u64().ok_or(IntentError::AmountOverflow)
}

/// Resolve a parsed instruction against fresh reserves.
///
/// `reserves` holds one snapshot per pool leg, in leg order.
pub fn resolve(
    instruction: &IntentInstruction,
    pool: &PoolInfo,
    target_mint: &Pubkey,
    reserves: &[ReserveSnapshot],
    slippage: &SlippageRatio,
) -> Result<ResolvedIntent, IntentError> {
    let [reserve0, reserve1] = reserves else {
        return Err(IntentError::IncompleteReserveData);
    };
    let snapshots = [reserve0, reserve1];

    let target = pool
        .leg_index(target_mint)
        .ok_or_else(|| IntentError::UnknownSymbol {
            symbol: instruction.target_symbol.clone(),
            available: Vec::new(),
        })?;
    let counter = 1 - target;

    let known_amount = to_base_units(&instruction.amount, snapshots[target].decimals)?;

    let (in_idx, out_idx, kind) = match instruction.direction {
        Direction::Sell => (target, counter, SwapKind::BaseInput),
        Direction::Buy => (counter, target, SwapKind::BaseOutput),
    };
    let curve = ConstantProduct::new(
        snapshots[in_idx].clone(),
        snapshots[out_idx].clone(),
        pool.trade_fee_rate,
    );

    let amounts = match kind {
        SwapKind::BaseInput => {
            let quote = curve.quote_out(&known_amount)?;
            SwapAmounts {
                min_amount_out: Some(apply_floor(&quote, Some(slippage))),
                max_amount_in: None,
                known_amount,
                quote_amount: quote,
            }
        }
        SwapKind::BaseOutput => {
            let quote = curve.quote_in(&known_amount)?;
            SwapAmounts {
                min_amount_out: None,
                max_amount_in: Some(apply_ceil(&quote, Some(slippage))),
                known_amount,
                quote_amount: quote,
            }
        }
    };
    debug!(
        "Resolved {} as {:?}: known {} quote {}",
        instruction, kind, amounts.known_amount, amounts.quote_amount
    );

    let leg = |idx: usize| SwapLeg {
        mint: pool.legs[idx].mint,
        vault: pool.legs[idx].vault,
        program: pool.legs[idx].program,
        decimals: snapshots[idx].decimals,
    };

    Ok(ResolvedIntent {
        instruction: instruction.clone(),
        kind,
        amounts,
        token_in: leg(in_idx),
        token_out: leg(out_idx),
        pool: pool.accounts(),
    })
}

/// Parse `line`, map its symbol through `directory`, and resolve it.
pub fn resolve_intent(
    line: &str,
    pool: &PoolInfo,
    directory: &SymbolDirectory,
    reserves: &[ReserveSnapshot],
    slippage: &SlippageRatio,
) -> Result<ResolvedIntent, IntentError> {
    let instruction = parse_intent(line)?;
    let target_mint = directory.mint_for_symbol(&instruction.target_symbol)?;
    resolve(&instruction, pool, &target_mint, reserves, slippage)
}
