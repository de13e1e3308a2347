//! Dynamic APY and payout formulas, confirmed against the tier table and
//! constants in `nxf-core::constants`.

use nxf_core::constants::{
    BASE_INTEREST_PENALTY, BASE_PRINCIPAL_PENALTY, DEMAND_SENSITIVITY, INTEREST_PENALTY_SCALE,
    MAX_DEMAND_MULTIPLIER, MIN_DEMAND_MULTIPLIER, PRINCIPAL_PENALTY_SCALE, SECONDS_PER_YEAR,
    TARGET_STAKE_RATIO,
};
use nxf_core::stake::StakeRecord;
use nxf_core::transaction::StakeTier;
use nxf_core::types::{Drops, Timestamp};

/// Maximum base APY across the tier table (the 365-day tier), derived from
/// the table itself so it cannot drift if a tier's APY is ever retuned.
pub const fn max_base_apy() -> f64 {
    StakeTier::Days365.base_apy()
}

/// `clamp(0.5, 2.0, 1 + (target_ratio - stake_ratio) * sensitivity)`.
pub fn demand_multiplier(stake_ratio: f64) -> f64 {
    let raw = 1.0 + (TARGET_STAKE_RATIO - stake_ratio) * DEMAND_SENSITIVITY;
    raw.clamp(MIN_DEMAND_MULTIPLIER, MAX_DEMAND_MULTIPLIER)
}

/// APY for `tier` given the current network-wide staking ratio. Computed at
/// stake creation and frozen into the record; never recomputed afterward.
pub fn effective_apy(tier: StakeTier, stake_ratio: f64) -> f64 {
    tier.base_apy() * demand_multiplier(stake_ratio)
}

fn round_drops(x: f64) -> Drops {
    x.max(0.0).round() as Drops
}

/// Linear interest accrual: `principal * effective_apy * elapsed / year`.
pub fn accrued_interest(principal: Drops, effective_apy: f64, elapsed_secs: i64) -> Drops {
    if elapsed_secs <= 0 {
        return 0;
    }
    let interest = principal as f64 * effective_apy * (elapsed_secs as f64) / SECONDS_PER_YEAR;
    round_drops(interest)
}

/// Maturity payout for a locked-tier stake: `(total_payout, interest_component)`.
/// Flexible stakes never mature automatically; callers must not invoke this
/// for `StakeTier::Flexible`.
pub fn maturity_payout(record: &StakeRecord) -> (Drops, Drops) {
    let interest = accrued_interest(record.principal, record.effective_apy, record.lock_duration_secs);
    (record.principal.saturating_add(interest), interest)
}

/// `0.50 + (base_apy / max_tier_apy) * 0.40`, clamped to `[0.50, 0.90]`.
pub fn interest_penalty_rate(base_apy: f64) -> f64 {
    let raw = BASE_INTEREST_PENALTY + (base_apy / max_base_apy()) * INTEREST_PENALTY_SCALE;
    raw.clamp(0.50, 0.90)
}

/// `0.02 + (base_apy / max_tier_apy) * 0.08`, clamped to `[0.02, 0.10]`.
pub fn principal_penalty_rate(base_apy: f64) -> f64 {
    let raw = BASE_PRINCIPAL_PENALTY + (base_apy / max_base_apy()) * PRINCIPAL_PENALTY_SCALE;
    raw.clamp(0.02, 0.10)
}

/// `1 - min(1, elapsed / lock_duration)` for locked tiers; always `0` for
/// Flexible (no penalty, ever — and lock_duration is 0 so the ratio would
/// be undefined).
pub fn time_decay(tier: StakeTier, elapsed_secs: i64, lock_duration_secs: i64) -> f64 {
    if matches!(tier, StakeTier::Flexible) || lock_duration_secs <= 0 {
        return 0.0;
    }
    let elapsed = elapsed_secs.max(0) as f64;
    1.0 - (elapsed / lock_duration_secs as f64).min(1.0)
}

/// The outcome of cancelling a stake early: what is paid to the owner and
/// what is forfeited (burned principal, un-minted interest).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelPayout {
    pub payout: Drops,
    pub principal_burned: Drops,
    pub interest_forfeited: Drops,
}

/// Compute the payout and forfeiture for cancelling `record` at `now`.
pub fn cancel_payout(record: &StakeRecord, now: Timestamp) -> CancelPayout {
    let elapsed = (now - record.start_time).max(0);
    let accrued = accrued_interest(record.principal, record.effective_apy, elapsed);
    let decay = time_decay(record.tier, elapsed, record.lock_duration_secs);
    let interest_pen = interest_penalty_rate(record.effective_apy);
    let principal_pen = principal_penalty_rate(record.effective_apy);

    let principal_paid = round_drops(record.principal as f64 * (1.0 - principal_pen * decay));
    let interest_paid = round_drops(accrued as f64 * (1.0 - interest_pen * decay));

    CancelPayout {
        payout: principal_paid.saturating_add(interest_paid),
        principal_burned: record.principal.saturating_sub(principal_paid),
        interest_forfeited: accrued.saturating_sub(interest_paid),
    }
}

/// "What would I get right now" — shared by the read-only query path and by
/// ledger closure/unstake so both compute the same number. For an active
/// locked stake already past maturity this returns the maturity payout; for
/// Flexible or not-yet-matured stakes it returns the cancel-now payout
/// (which for Flexible always equals principal + accrued interest).
pub fn projected_payout(record: &StakeRecord, now: Timestamp) -> Drops {
    if !record.is_flexible() && now >= record.maturity_time {
        let (total, _) = maturity_payout(record);
        return total;
    }
    cancel_payout(record, now).payout
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxf_core::types::{AccountId, TxId};

    fn make_record(tier: StakeTier, principal: Drops, start: Timestamp) -> StakeRecord {
        let apy = effective_apy(tier, TARGET_STAKE_RATIO);
        StakeRecord::new(TxId::from_bytes([1; 32]), AccountId::from_bytes([2; 20]), principal, tier, apy, start)
    }

    #[test]
    fn at_target_ratio_multiplier_is_one() {
        assert!((demand_multiplier(TARGET_STAKE_RATIO) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn multiplier_clamped_at_extremes() {
        assert_eq!(demand_multiplier(0.0), MAX_DEMAND_MULTIPLIER);
        assert_eq!(demand_multiplier(1.0), MIN_DEMAND_MULTIPLIER);
    }

    #[test]
    fn flexible_cancel_pays_principal_plus_interest_no_penalty() {
        let principal = 1_000 * nxf_core::constants::DROPS_PER_NXF;
        let record = make_record(StakeTier::Flexible, principal, 0);
        let now = 86_400 * 30;
        let accrued = accrued_interest(principal, record.effective_apy, now);
        let result = cancel_payout(&record, now);
        assert_eq!(result.payout, principal + accrued);
        assert_eq!(result.principal_burned, 0);
        assert_eq!(result.interest_forfeited, 0);
    }

    #[test]
    fn locked_immediate_cancel_applies_principal_penalty_only() {
        let principal = 1_000 * nxf_core::constants::DROPS_PER_NXF;
        let record = make_record(StakeTier::Days365, principal, 1_000);
        let result = cancel_payout(&record, 1_000); // elapsed = 0
        let pen = principal_penalty_rate(record.effective_apy);
        let expected = round_drops(principal as f64 * (1.0 - pen));
        assert_eq!(result.payout, expected);
        assert_eq!(result.principal_burned, principal - expected);
        assert_eq!(result.interest_forfeited, 0);
    }

    #[test]
    fn maturity_payout_mints_exactly_accrued_interest() {
        let principal = 500 * nxf_core::constants::DROPS_PER_NXF;
        let record = make_record(StakeTier::Days90, principal, 0);
        let (total, interest) = maturity_payout(&record);
        assert_eq!(total, principal + interest);
        assert!(interest > 0);
    }

    #[test]
    fn projected_payout_matches_maturity_once_matured() {
        let principal = 200 * nxf_core::constants::DROPS_PER_NXF;
        let record = make_record(StakeTier::Days30, principal, 0);
        let (expected, _) = maturity_payout(&record);
        assert_eq!(projected_payout(&record, record.maturity_time), expected);
    }
}
