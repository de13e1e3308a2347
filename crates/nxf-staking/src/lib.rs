//! Staking math: dynamic APY, accrual, and maturity/cancellation payouts.
//!
//! Storage of `StakeRecord`s lives in `nxf-ledger`; this crate is pure
//! computation so the "what would I get if I cancelled now" query path and
//! the actual mutating maturity/cancel paths share one implementation.

pub mod apy;
pub mod query;

pub use apy::{
    accrued_interest, cancel_payout, demand_multiplier, effective_apy, interest_penalty_rate,
    maturity_payout, principal_penalty_rate, projected_payout, time_decay, CancelPayout,
};
pub use query::StakeSummary;
