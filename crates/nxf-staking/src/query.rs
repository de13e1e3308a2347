use nxf_core::stake::StakeRecord;
use nxf_core::types::{Drops, Timestamp, TxId};

use crate::apy::projected_payout;

/// A read-only projection of a stake record, suitable for RPC responses.
/// Computed rather than stored, so it always reflects the shared payout
/// formula in `apy.rs` instead of a parallel summary computation.
#[derive(Debug, Clone)]
pub struct StakeSummary {
    pub stake_id: TxId,
    pub principal: Drops,
    pub effective_apy: f64,
    pub maturity_time: Timestamp,
    pub matured: bool,
    pub cancelled: bool,
    pub is_flexible: bool,
    /// What cancelling (or, if already past maturity, settling) the stake
    /// would currently pay out.
    pub projected_payout: Drops,
}

impl StakeSummary {
    pub fn from_record(record: &StakeRecord, now: Timestamp) -> Self {
        Self {
            stake_id: record.stake_id,
            principal: record.principal,
            effective_apy: record.effective_apy,
            maturity_time: record.maturity_time,
            matured: record.matured,
            cancelled: record.cancelled,
            is_flexible: record.is_flexible(),
            projected_payout: if record.is_active() {
                projected_payout(record, now)
            } else {
                record.payout.unwrap_or(0)
            },
        }
    }
}
