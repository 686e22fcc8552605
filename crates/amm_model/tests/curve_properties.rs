//! Property tests for the constant product curve and slippage bounds
//!
//! Increase cases: PROPTEST_CASES=5000 cargo test -p amm_model

use amm_model::*;
use num_bigint::BigInt;
use proptest::prelude::*;

fn pool(reserve_in: u64, reserve_out: u64, fee: u64) -> ConstantProduct {
    ConstantProduct::new(
        ReserveSnapshot::new(reserve_in, 9),
        ReserveSnapshot::new(reserve_out, 6),
        fee,
    )
}

fn ratio(numer: u32, denom: u32) -> SlippageRatio {
    SlippageRatio::from_ratio(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
        .unwrap()
}

// ============================================================================
// CURVE
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// With a real fee and the output side at least as deep as the input
    /// side, the retained fee outweighs curve rounding and k grows.
    #[test]
    fn prop_invariant_grows_with_fee(
        reserve_in in 1_000_000u64..1_000_000_000_000,
        depth in 1u64..1_000,
        fee in 2_500u64..10_000,
        fraction in 1u64..=1_000,
    ) {
        let reserve_out = reserve_in * depth;
        let amount_in = (reserve_in / 1_000 * fraction).max(10_000);
        let cp = pool(reserve_in, reserve_out, fee);

        let amount_in = BigUint::from(amount_in);
        let amount_out = cp.quote_out(&amount_in).unwrap();

        let k0 = BigUint::from(reserve_in) * BigUint::from(reserve_out);
        let k1 = (BigUint::from(reserve_in) + &amount_in)
            * (BigUint::from(reserve_out) - &amount_out);
        prop_assert!(k1 >= k0, "k shrank: {} -> {}", k0, k1);
    }

    /// Counting only the post-fee input, k never grows and the only drift
    /// is the floor on the new reserve.
    #[test]
    fn prop_net_input_drift_bounded(
        reserve_in in 1_000u64..1_000_000_000_000,
        reserve_out in 1_000u64..1_000_000_000_000,
        fee in 0u64..100_000,
        amount_in in 1u64..1_000_000_000,
    ) {
        let cp = pool(reserve_in, reserve_out, fee);
        let amount_in = BigUint::from(amount_in);
        if let Ok(amount_out) = cp.quote_out(&amount_in) {
            let net_in = amount_after_trade_fee(&amount_in, fee).unwrap();
            let x1 = BigUint::from(reserve_in) + &net_in;
            let k0 = BigUint::from(reserve_in) * BigUint::from(reserve_out);
            let k1 = &x1 * (BigUint::from(reserve_out) - &amount_out);
            prop_assert!(k1 <= k0);
            prop_assert!(k0 < k1 + x1);
        }
    }

    /// Round trip at zero fee never lets the trader pay less than they
    /// started with.
    #[test]
    fn prop_fee_free_round_trip(
        reserve_in in 1_000u64..1_000_000_000_000,
        reserve_out in 1_000u64..1_000_000_000_000,
        amount_in in 1u64..1_000_000_000,
    ) {
        let cp = pool(reserve_in, reserve_out, 0);
        let amount_in = BigUint::from(amount_in);
        if let Ok(amount_out) = cp.quote_out(&amount_in) {
            let back = cp.quote_in(&amount_out).unwrap();
            prop_assert!(back >= amount_in, "{} < {}", back, amount_in);
        }
    }

    /// More input never buys less output.
    #[test]
    fn prop_quote_out_monotone(
        reserve_in in 1_000u64..1_000_000_000_000,
        reserve_out in 1_000u64..1_000_000_000_000,
        fee in 0u64..100_000,
        amount in 1u64..1_000_000_000,
        extra in 0u64..1_000_000_000,
    ) {
        let cp = pool(reserve_in, reserve_out, fee);
        let small = cp.quote_out(&BigUint::from(amount));
        let large = cp.quote_out(&BigUint::from(amount + extra));
        if let (Ok(small), Ok(large)) = (small, large) {
            prop_assert!(small <= large);
        }
    }

    /// A non-zero fee strictly raises the input needed for a given output.
    #[test]
    fn prop_fee_raises_quote_in(
        reserve_in in 1_000u64..1_000_000_000_000,
        reserve_out in 1_000u64..1_000_000_000_000,
        fee in 1u64..100_000,
        amount_out in 1u64..1_000,
    ) {
        let free = pool(reserve_in, reserve_out, 0);
        let charged = pool(reserve_in, reserve_out, fee);
        let amount_out = BigUint::from(amount_out);
        if let (Ok(free), Ok(charged)) = (free.quote_in(&amount_out), charged.quote_in(&amount_out)) {
            prop_assert!(charged > free);
        }
    }

    /// Asking for the whole output reserve, or more, always fails.
    #[test]
    fn prop_cannot_drain_pool(
        reserve_in in 1u64..1_000_000_000_000,
        reserve_out in 1u64..1_000_000_000_000,
        excess in 0u64..1_000_000,
    ) {
        let cp = pool(reserve_in, reserve_out, 2_500);
        let result = cp.quote_in(&BigUint::from(reserve_out + excess));
        let is_liquidity_exceeded = matches!(result, Err(AmmError::LiquidityExceeded { .. }));
        prop_assert!(is_liquidity_exceeded);
    }

    /// Any successful sell quote leaves something in the pool.
    #[test]
    fn prop_quote_out_below_reserve(
        reserve_in in 1u64..1_000_000_000_000,
        reserve_out in 1u64..1_000_000_000_000,
        fee in 0u64..100_000,
        amount_in in 1u64..u64::MAX,
    ) {
        let cp = pool(reserve_in, reserve_out, fee);
        if let Ok(out) = cp.quote_out(&BigUint::from(amount_in)) {
            prop_assert!(out > BigUint::from(0u32));
            prop_assert!(out < BigUint::from(reserve_out));
        }
    }
}

// ============================================================================
// SLIPPAGE
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_floor_monotone_in_ratio(
        amount in 0u64..u64::MAX,
        a in 0u32..10_000,
        b in 0u32..10_000,
    ) {
        let (lo, hi) = (a.min(b), a.max(b));
        let amount = BigUint::from(amount);
        let tight = apply_floor(&amount, Some(&ratio(lo, 10_000)));
        let loose = apply_floor(&amount, Some(&ratio(hi, 10_000)));
        prop_assert!(loose <= tight);
        prop_assert!(tight <= amount);
    }

    #[test]
    fn prop_ceil_monotone_in_ratio(
        amount in 0u64..u64::MAX,
        a in 0u32..10_000,
        b in 0u32..10_000,
    ) {
        let (lo, hi) = (a.min(b), a.max(b));
        let amount = BigUint::from(amount);
        let tight = apply_ceil(&amount, Some(&ratio(lo, 10_000)));
        let loose = apply_ceil(&amount, Some(&ratio(hi, 10_000)));
        prop_assert!(tight <= loose);
        prop_assert!(amount <= tight);
    }

    #[test]
    fn prop_zero_ratio_is_identity(amount in 0u64..u64::MAX) {
        let amount = BigUint::from(amount);
        let zero = SlippageRatio::zero();
        prop_assert_eq!(apply_floor(&amount, Some(&zero)), amount.clone());
        prop_assert_eq!(apply_ceil(&amount, Some(&zero)), amount);
    }
}

// ============================================================================
// FIXED POINT
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Rendering at full precision and parsing back is lossless.
    #[test]
    fn prop_display_parse_exact(raw in 1u64..u64::MAX, decimals in 0u8..=12) {
        let raw = BigUint::from(raw);
        let shown = to_display_string(Some(&raw), decimals, usize::from(decimals));
        prop_assert_eq!(to_base_units(&shown, decimals).unwrap(), raw);
    }
}
