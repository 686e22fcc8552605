//! Fixed-point conversion between decimal strings and integer base units

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::Zero;

use crate::AmmError;

/// Largest decimal exponent accepted in an amount literal
const MAX_EXPONENT: u32 = 1_000;

/// 10^decimals
pub fn scale(decimals: u8) -> BigUint {
    BigUint::from(10u32).pow(u32::from(decimals))
}

/// Parse a decimal literal into an exact rational.
///
/// Accepts an optional sign, an integer and/or fractional part, an optional
/// `e`/`E` exponent, and the `a/b` fraction form. Returns `None` for anything
/// else.
pub fn parse_decimal(literal: &str) -> Option<BigRational> {
    let s = literal.trim();
    if s.is_empty() {
        return None;
    }

    if let Some((numer, denom)) = s.split_once('/') {
        let numer: BigInt = numer.trim().parse().ok()?;
        let denom: BigInt = denom.trim().parse().ok()?;
        if denom.is_zero() {
            return None;
        }
        return Some(BigRational::new(numer, denom));
    }

    let (mantissa, exponent) = match s.find(|c| c == 'e' || c == 'E') {
        Some(idx) => (&s[..idx], s[idx + 1..].parse::<i64>().ok()?),
        None => (s, 0),
    };

    let (negative, digits) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part
        .bytes()
        .chain(frac_part.bytes())
        .all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let joined = format!("{int_part}{frac_part}");
    let mut numer = BigInt::parse_bytes(joined.as_bytes(), 10)?;
    if negative {
        numer = -numer;
    }

    let shift = exponent.checked_sub(i64::try_from(frac_part.len()).ok()?)?;
    if shift.unsigned_abs() > u64::from(MAX_EXPONENT) {
        return None;
    }
    let ten = BigInt::from(10u32);
    let magnitude = ten.pow(shift.unsigned_abs() as u32);
    if shift >= 0 {
        Some(BigRational::from_integer(numer * magnitude))
    } else {
        Some(BigRational::new(numer, magnitude))
    }
}

/// Convert a human decimal amount into integer base units.
///
/// The conversion is exact: a literal with more fractional digits than
/// `decimals` is rejected instead of rounded.
pub fn to_base_units(literal: &str, decimals: u8) -> Result<BigUint, AmmError> {
    let value =
        parse_decimal(literal).ok_or_else(|| AmmError::InvalidAmount(literal.to_string()))?;
    if value <= BigRational::zero() {
        return Err(AmmError::NonPositiveAmount);
    }

    let scaled = value * BigRational::from_integer(BigInt::from(scale(decimals)));
    if !scaled.is_integer() {
        return Err(AmmError::PrecisionExceeded {
            amount: literal.trim().to_string(),
            decimals,
        });
    }

    scaled
        .to_integer()
        .to_biguint()
        .ok_or(AmmError::NonPositiveAmount)
}

/// Render base units as a decimal string with `precision` fractional digits.
///
/// The last digit is rounded half away from zero. An absent amount renders
/// as `"0"`; this is a display helper and never feeds back into the math.
pub fn to_display_string(amount: Option<&BigUint>, decimals: u8, precision: usize) -> String {
    let Some(raw) = amount else {
        return "0".to_string();
    };

    let denom = scale(decimals);
    let numerator = raw * BigUint::from(10u32).pow(precision as u32);
    let mut quotient = &numerator / &denom;
    let remainder = &numerator % &denom;
    if remainder * 2u32 >= denom {
        quotient += 1u32;
    }

    let digits = quotient.to_str_radix(10);
    if precision == 0 {
        return digits;
    }
    let padded = format!("{:0>width$}", digits, width = precision + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - precision);
    format!("{int_part}.{frac_part}")
}
