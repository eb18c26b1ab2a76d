//! Fixed-point accrual arithmetic for the staking campaign engine.
//!
//! All values are scaled integers; the rounding rule is floor at every
//! division. Two precision constants are involved:
//!
//! * [`RATE_PRECISION`] (`P`) scales the per-second reward rate so that
//!   campaigns whose total reward is small relative to their duration do not
//!   truncate to a zero rate.
//! * [`SHARE_PRECISION`] (`S`) scales the global reward-per-share accumulator
//!   so that per-share deltas survive large total-stake denominators.

/// Scaling factor for the per-second reward rate (`P`, 10^7).
pub const RATE_PRECISION: i128 = 10_000_000;

/// Scaling factor for the reward-per-share accumulator (`S`, 10^12).
pub const SHARE_PRECISION: i128 = 1_000_000_000_000;

/// Campaign durations are expressed in whole days.
pub const SECONDS_PER_DAY: u64 = 86_400;

// ── Core accrual engine ─────────────────────────────────────────────────────

/// Convert a campaign budget into a scaled per-second emission rate.
///
/// ```text
/// rate = amount × P / duration_days / 86_400
/// ```
///
/// The multiplication happens strictly before either division; reordering
/// would truncate small budgets to zero before the precision factor can
/// preserve them.
#[allow(clippy::arithmetic_side_effects)]
pub fn rate_per_second(amount: i128, duration_days: u64) -> i128 {
    amount.saturating_mul(RATE_PRECISION) / (duration_days as i128) / (SECONDS_PER_DAY as i128)
}

/// Advance the global reward-per-share accumulator by `elapsed` seconds.
///
/// ```text
/// Δacc = elapsed × rate × S / total_staked / P
/// new_acc = acc + Δacc
/// ```
///
/// When `total_staked` is zero the accumulator is returned unchanged: an
/// empty pool earns nothing, and the window's reward is forfeited rather
/// than rolled forward.
///
/// The result is never smaller than `acc` for non-negative inputs, which is
/// what keeps per-user `reward_debt` snapshots valid across settlements.
#[allow(clippy::arithmetic_side_effects)]
pub fn accumulate(acc: i128, rate: i128, elapsed: u64, total_staked: i128) -> i128 {
    if total_staked <= 0 {
        return acc;
    }

    let delta = rate
        .saturating_mul(elapsed as i128)
        .saturating_mul(SHARE_PRECISION)
        / total_staked
        / RATE_PRECISION;

    acc.saturating_add(delta)
}

/// Reward newly owed to a position since its last settlement.
///
/// ```text
/// owed = staked × (acc − debt) / S
/// ```
///
/// `debt` is the accumulator snapshot taken at the position's previous
/// settlement, so only accrual that happened since then is counted.
#[allow(clippy::arithmetic_side_effects)]
pub fn owed(staked: i128, acc: i128, debt: i128) -> i128 {
    staked.saturating_mul(acc.saturating_sub(debt)) / SHARE_PRECISION
}

// ── Unit tests ──────────────────────────────────────────────────────────────
// Pure-math tests with no Soroban environment dependency.

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rate_matches_reference_parameters() {
        // 300 tokens (7 decimals) over 30 days:
        // 3_000_000_000 × 10^7 / 30 / 86_400 = 11_574_074_074 (floored).
        let rate = rate_per_second(3_000_000_000, 30);
        assert_eq!(rate, 11_574_074_074);
    }

    #[test]
    fn rate_multiplies_before_dividing() {
        // 1 unit over 2 days would truncate to zero if divided first.
        let rate = rate_per_second(1, 2);
        assert_eq!(rate, 10_000_000 / 2 / 86_400);
        assert!(rate > 0);
    }

    #[test]
    fn accumulate_is_noop_when_pool_empty() {
        let acc = accumulate(500, 1_000_000_000_000, 3_600, 0);
        assert_eq!(acc, 500, "empty pool must not advance the accumulator");
    }

    #[test]
    fn accumulate_round_numbers() {
        // rate = 10^12 (100_000 units/s actual), total = 10^6, elapsed = 1s:
        // Δacc = 10^12 × 10^12 / 10^6 / 10^7 = 10^11
        let acc = accumulate(0, 1_000_000_000_000, 1, 1_000_000);
        assert_eq!(acc, 100_000_000_000);
    }

    #[test]
    fn owed_zero_without_new_accrual() {
        assert_eq!(owed(1_000_000, 42, 42), 0);
    }

    #[test]
    fn owed_full_pool_recovers_emission() {
        // Sole staker over 100 seconds at 100_000 units/s actual.
        let acc = accumulate(0, 1_000_000_000_000, 100, 1_000_000);
        assert_eq!(owed(1_000_000, acc, 0), 10_000_000);
    }

    proptest! {
        // Ranges chosen well below the saturation points so the properties
        // hold exactly, not merely up to clamping.
        #[test]
        fn accumulate_is_monotone(
            acc in 0i128..1_000_000_000_000_000_000,
            rate in 0i128..1_000_000_000_000_000,
            elapsed in 0u64..10_000_000,
            total in 1i128..1_000_000_000_000_000_000,
        ) {
            prop_assert!(accumulate(acc, rate, elapsed, total) >= acc);
        }

        #[test]
        fn owed_never_exceeds_emission(
            rate in 0i128..1_000_000_000_000_000,
            elapsed in 0u64..10_000_000,
            total in 1i128..1_000_000_000_000,
        ) {
            let acc = accumulate(0, rate, elapsed, total);
            let paid = owed(total, acc, 0);
            // Floor rounding only ever under-pays the pool.
            let emitted = rate * (elapsed as i128) / RATE_PRECISION;
            prop_assert!(paid <= emitted);
        }

        #[test]
        fn owed_splits_conserve(
            a in 1i128..1_000_000_000,
            b in 1i128..1_000_000_000,
            rate in 0i128..1_000_000_000_000,
            elapsed in 0u64..1_000_000,
        ) {
            // Two positions never collect more than one position holding
            // both stakes would.
            let total = a + b;
            let acc = accumulate(0, rate, elapsed, total);
            prop_assert!(owed(a, acc, 0) + owed(b, acc, 0) <= owed(total, acc, 0));
        }

        #[test]
        fn rate_floor_bound(
            amount in 1i128..1_000_000_000_000_000,
            days in 1u64..3_650,
        ) {
            // Total scheduled emission never exceeds the funded budget.
            let rate = rate_per_second(amount, days);
            let scheduled = rate * (days as i128) * (SECONDS_PER_DAY as i128);
            prop_assert!(scheduled <= amount * RATE_PRECISION);
        }
    }
}
