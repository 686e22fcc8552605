//! Slippage tolerance bounds

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::fixed_point::parse_decimal;
use crate::AmmError;

/// Slippage tolerance as an exact fraction in `[0, 1)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlippageRatio(BigRational);

impl SlippageRatio {
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    /// Build from a fraction, rejecting anything outside `[0, 1)`.
    pub fn from_ratio(ratio: BigRational) -> Result<Self, AmmError> {
        if ratio < BigRational::zero() || ratio >= BigRational::one() {
            return Err(AmmError::InvalidSlippage(ratio.to_string()));
        }
        Ok(Self(ratio))
    }

    /// Build from a percentage such as `0.5` or `1`.
    ///
    /// The float goes through its shortest decimal rendering, so `1.0`
    /// becomes exactly 1/100 rather than the nearest binary fraction.
    pub fn from_percent(percent: f64) -> Result<Self, AmmError> {
        if !percent.is_finite() || !(0.0..100.0).contains(&percent) {
            return Err(AmmError::InvalidSlippage(percent.to_string()));
        }
        let exact = parse_decimal(&percent.to_string())
            .ok_or_else(|| AmmError::InvalidSlippage(percent.to_string()))?;
        Self::from_ratio(exact / BigRational::from_integer(BigInt::from(100u32)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_ratio(&self) -> &BigRational {
        &self.0
    }

    /// The tolerance expressed in percent
    pub fn as_percent(&self) -> BigRational {
        &self.0 * BigRational::from_integer(BigInt::from(100u32))
    }
}

impl Default for SlippageRatio {
    fn default() -> Self {
        Self::zero()
    }
}

/// Percent -> ratio, e.g. `0.5` -> `1/200`
pub fn slippage_ratio(percent: f64) -> Result<SlippageRatio, AmmError> {
    SlippageRatio::from_percent(percent)
}

fn scaled(amount: &BigUint, factor: BigRational) -> BigRational {
    BigRational::from_integer(BigInt::from(amount.clone())) * factor
}

/// Worst acceptable receipt: `floor(amount * (1 - ratio))`
pub fn apply_floor(amount: &BigUint, ratio: Option<&SlippageRatio>) -> BigUint {
    match ratio {
        Some(r) if !r.is_zero() => scaled(amount, BigRational::one() - &r.0)
            .floor()
            .to_integer()
            .to_biguint()
            .unwrap_or_default(),
        _ => amount.clone(),
    }
}

/// Worst acceptable payment: `ceil(amount * (1 + ratio))`
pub fn apply_ceil(amount: &BigUint, ratio: Option<&SlippageRatio>) -> BigUint {
    match ratio {
        Some(r) if !r.is_zero() => scaled(amount, BigRational::one() + &r.0)
            .ceil()
            .to_integer()
            .to_biguint()
            .unwrap_or_default(),
        _ => amount.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_percent_bounds() {
        let ratio = slippage_ratio(1.0).unwrap();
        let amount = BigUint::from(1000u32);
        assert_eq!(apply_floor(&amount, Some(&ratio)), BigUint::from(990u32));
        assert_eq!(apply_ceil(&amount, Some(&ratio)), BigUint::from(1010u32));
    }

    #[test]
    fn test_fractional_percent_is_exact() {
        let ratio = slippage_ratio(0.5).unwrap();
        assert_eq!(
            ratio.as_ratio(),
            &BigRational::new(BigInt::from(1u32), BigInt::from(200u32))
        );

        let ratio = slippage_ratio(0.1).unwrap();
        assert_eq!(
            ratio.as_ratio(),
            &BigRational::new(BigInt::from(1u32), BigInt::from(1000u32))
        );
    }

    #[test]
    fn test_rounding_direction() {
        let ratio = slippage_ratio(0.5).unwrap();
        let amount = BigUint::from(181u32);
        // 181 * 0.995 = 180.095
        assert_eq!(apply_floor(&amount, Some(&ratio)), BigUint::from(180u32));
        // 181 * 1.005 = 181.905
        assert_eq!(apply_ceil(&amount, Some(&ratio)), BigUint::from(182u32));
    }

    #[test]
    fn test_identity_when_absent_or_zero() {
        let amount = BigUint::from(1234u32);
        let zero = SlippageRatio::zero();
        assert_eq!(apply_floor(&amount, None), amount);
        assert_eq!(apply_ceil(&amount, None), amount);
        assert_eq!(apply_floor(&amount, Some(&zero)), amount);
        assert_eq!(apply_ceil(&amount, Some(&zero)), amount);
    }

    #[test]
    fn test_invalid_slippage() {
        assert!(matches!(slippage_ratio(-0.1), Err(AmmError::InvalidSlippage(_))));
        assert!(matches!(slippage_ratio(100.0), Err(AmmError::InvalidSlippage(_))));
        assert!(matches!(slippage_ratio(f64::NAN), Err(AmmError::InvalidSlippage(_))));
        assert!(slippage_ratio(99.9).is_ok());
        assert!(slippage_ratio(0.0).unwrap().is_zero());
    }
}
