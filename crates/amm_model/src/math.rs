//! Constant product AMM math (x·y=k)

use num_bigint::BigUint;
use num_traits::{CheckedSub, Zero};

use crate::fees::{amount_after_trade_fee, amount_before_trade_fee, trade_fee_numerator};
use crate::fixed_point::to_display_string;
use crate::AmmError;

/// One side of the pool as seen at quote time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveSnapshot {
    /// Vault balance in base units
    pub balance: BigUint,

    /// Mint decimals of the vault's token
    pub decimals: u8,
}

impl ReserveSnapshot {
    pub fn new(balance: impl Into<BigUint>, decimals: u8) -> Self {
        Self {
            balance: balance.into(),
            decimals,
        }
    }

    fn available(&self) -> String {
        to_display_string(
            Some(&self.balance),
            self.decimals,
            usize::from(self.decimals),
        )
    }
}

/// Oriented pool state for a single trade: the side the trader pays into and
/// the side the trader receives from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantProduct {
    pub token_in_reserve: ReserveSnapshot,
    pub token_out_reserve: ReserveSnapshot,

    /// Trade fee in parts per million of the input amount
    pub trade_fee_rate: u64,
}

impl ConstantProduct {
    pub fn new(
        token_in_reserve: ReserveSnapshot,
        token_out_reserve: ReserveSnapshot,
        trade_fee_rate: u64,
    ) -> Self {
        Self {
            token_in_reserve,
            token_out_reserve,
            trade_fee_rate,
        }
    }

    fn check_inputs(&self, amount: &BigUint) -> Result<(), AmmError> {
        if amount.is_zero() {
            return Err(AmmError::InvalidQuoteInput("amount must be greater than zero"));
        }
        if self.token_in_reserve.balance.is_zero() || self.token_out_reserve.balance.is_zero() {
            return Err(AmmError::InvalidQuoteInput("pool reserves must be non-zero"));
        }
        trade_fee_numerator(self.trade_fee_rate)?;
        Ok(())
    }

    /// Output for a known input (BaseInput)
    ///
    /// Fee on input:
    /// - Δin_net = floor(Δin · (1 - fee))
    /// - k = in0 · out0
    /// - out1 = floor(k / (in0 + Δin_net))
    /// - Δout = out0 - out1
    ///
    /// Flooring `out1` can only favour the trader by less than one unit,
    /// and the fee more than covers it, so k never decreases.
    pub fn quote_out(&self, amount_in: &BigUint) -> Result<BigUint, AmmError> {
        self.check_inputs(amount_in)?;

        let reserve_in = &self.token_in_reserve.balance;
        let reserve_out = &self.token_out_reserve.balance;

        let net_in = amount_after_trade_fee(amount_in, self.trade_fee_rate)?;
        let k = reserve_in * reserve_out;
        let new_reserve_out = k / (reserve_in + &net_in);

        let amount_out = reserve_out
            .checked_sub(&new_reserve_out)
            .ok_or(AmmError::NonPositiveResult)?;
        if amount_out.is_zero() {
            return Err(AmmError::NonPositiveResult);
        }
        if &amount_out >= reserve_out {
            return Err(AmmError::LiquidityExceeded {
                available: self.token_out_reserve.available(),
            });
        }
        Ok(amount_out)
    }

    /// Input required for a known output (BaseOutput)
    ///
    /// Fee on input:
    /// - out1 = out0 - Δout
    /// - in1 = floor(k / out1)
    /// - Δin_net = in1 - in0
    /// - Δin = ceil(Δin_net / (1 - fee))
    pub fn quote_in(&self, amount_out: &BigUint) -> Result<BigUint, AmmError> {
        self.check_inputs(amount_out)?;

        let reserve_in = &self.token_in_reserve.balance;
        let reserve_out = &self.token_out_reserve.balance;

        if amount_out >= reserve_out {
            return Err(AmmError::LiquidityExceeded {
                available: self.token_out_reserve.available(),
            });
        }

        let k = reserve_in * reserve_out;
        let new_reserve_in = k / (reserve_out - amount_out);
        let net_in = new_reserve_in
            .checked_sub(reserve_in)
            .ok_or(AmmError::NonPositiveResult)?;
        if net_in.is_zero() {
            return Err(AmmError::NonPositiveResult);
        }

        amount_before_trade_fee(&net_in, self.trade_fee_rate)
    }
}
