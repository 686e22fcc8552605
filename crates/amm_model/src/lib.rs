//! AMM Model - Pure constant product math (x·y=k) for CP-swap pools
//!
//! This crate holds every piece of arithmetic the client performs on pool
//! data: decimal <-> base unit conversion, trade fee application, the
//! constant product quote in both directions, and slippage bounds.
//!
//! All amounts are arbitrary-precision integers. Real pool reserves
//! overflow `u64` products long before they overflow anything else, so no
//! fixed-width type appears on the math path.

pub mod fees;
pub mod fixed_point;
pub mod math;
pub mod slippage;

pub use fees::{amount_after_trade_fee, amount_before_trade_fee};
pub use fixed_point::{parse_decimal, scale, to_base_units, to_display_string};
pub use math::{ConstantProduct, ReserveSnapshot};
pub use slippage::{apply_ceil, apply_floor, slippage_ratio, SlippageRatio};

pub use num_bigint::BigUint;
pub use num_rational::BigRational;

/// Trade fee denominator (fee rates are parts per million)
pub const FEE_RATE_DENOMINATOR: u64 = 1_000_000;

/// Error types for AMM operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmmError {
    /// Amount literal is not a decimal number
    #[error("the amount provided is an invalid decimal number: {0:?}")]
    InvalidAmount(String),

    /// Amount literal is zero or negative
    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    /// Amount literal carries more fractional digits than the token allows
    #[error("amount {amount} exceeds decimal precision of {decimals}")]
    PrecisionExceeded { amount: String, decimals: u8 },

    /// Slippage percent outside [0, 100)
    #[error("slippage must be >= 0 and < 100 percent, got {0}")]
    InvalidSlippage(String),

    /// Fee rate at or above the denominator
    #[error("trade fee rate {0} is invalid")]
    InvalidFeeRate(u64),

    /// Zero amount or empty reserves handed to a quote
    #[error("invalid quote input: {0}")]
    InvalidQuoteInput(&'static str),

    /// The curve produced a zero amount
    #[error("trade would not yield a positive amount")]
    NonPositiveResult,

    /// The trade would drain one side of the pool
    #[error("requested amount would exceed available {available} liquidity")]
    LiquidityExceeded { available: String },
}

/// Divide rounding up. `denominator` must be non-zero.
pub(crate) fn div_ceil(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    let quotient = numerator / denominator;
    if (numerator % denominator) == BigUint::from(0u32) {
        quotient
    } else {
        quotient + 1u32
    }
}
