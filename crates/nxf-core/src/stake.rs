use serde::{Deserialize, Serialize};

use crate::transaction::StakeTier;
use crate::types::{AccountId, Drops, Timestamp, TxId};

/// A single stake position. `stake_id` is the id of the transaction that
/// created it, so the same `Stake` transaction can never open two records.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakeRecord {
    pub stake_id: TxId,
    pub owner: AccountId,
    pub principal: Drops,
    pub tier: StakeTier,
    pub base_apy: f64,
    /// APY captured at creation time, after the demand multiplier. Frozen
    /// for the life of the record regardless of later demand shifts.
    pub effective_apy: f64,
    pub lock_duration_secs: i64,
    pub start_time: Timestamp,
    pub maturity_time: Timestamp,
    pub matured: bool,
    pub cancelled: bool,
    /// Set once the record leaves the active state (matured or cancelled).
    pub payout: Option<Drops>,
}

impl StakeRecord {
    pub fn new(
        stake_id: TxId,
        owner: AccountId,
        principal: Drops,
        tier: StakeTier,
        effective_apy: f64,
        start_time: Timestamp,
    ) -> Self {
        let lock_duration_secs = tier.lock_duration_secs();
        Self {
            stake_id,
            owner,
            principal,
            tier,
            base_apy: tier.base_apy(),
            effective_apy,
            lock_duration_secs,
            start_time,
            maturity_time: start_time + lock_duration_secs,
            matured: false,
            cancelled: false,
            payout: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.matured && !self.cancelled
    }

    pub fn is_flexible(&self) -> bool {
        matches!(self.tier, StakeTier::Flexible)
    }
}
