//! Trade fee transforms
//!
//! The pool charges its fee on the input leg. Going forward (known input) the
//! fee is taken off the gross amount with floor division; going backward
//! (known output) the net amount is grossed up with ceiling division so the
//! pool is never shortchanged by rounding.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::{div_ceil, AmmError, FEE_RATE_DENOMINATOR};

/// `FEE_RATE_DENOMINATOR - fee_rate`, rejecting rates that would leave
/// nothing after the fee.
pub(crate) fn trade_fee_numerator(fee_rate: u64) -> Result<u64, AmmError> {
    // Hard coded denominator; the program does not expose it on chain.
    if fee_rate >= FEE_RATE_DENOMINATOR {
        return Err(AmmError::InvalidFeeRate(fee_rate));
    }
    Ok(FEE_RATE_DENOMINATOR - fee_rate)
}

/// Net amount after the trade fee: `floor(amount * (D - fee) / D)`
pub fn amount_after_trade_fee(amount: &BigUint, fee_rate: u64) -> Result<BigUint, AmmError> {
    let numerator = trade_fee_numerator(fee_rate)?;
    let net = amount * numerator / FEE_RATE_DENOMINATOR;
    if net.is_zero() {
        return Err(AmmError::NonPositiveResult);
    }
    Ok(net)
}

/// Gross amount whose post-fee value is at least `net`:
/// `ceil(net * D / (D - fee))`
pub fn amount_before_trade_fee(net: &BigUint, fee_rate: u64) -> Result<BigUint, AmmError> {
    let numerator = trade_fee_numerator(fee_rate)?;
    if net.is_zero() {
        return Err(AmmError::InvalidQuoteInput(
            "net amount must be greater than zero when removing the trade fee",
        ));
    }
    let gross = net * FEE_RATE_DENOMINATOR;
    Ok(div_ceil(&gross, &BigUint::from(numerator)))
}
