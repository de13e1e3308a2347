use serde::{Deserialize, Serialize};

/// Account summary returned by `nxf_getAccount`. Balances are rendered as
/// decimal-string drops so large `u64`/`i128` values survive JSON clients
/// that parse numbers as `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcAccount {
    pub account_id: String,
    pub balance_drops: String,
    pub spendable_drops: String,
    pub sequence: u32,
    pub owner_count: u32,
    pub flags: u32,
    pub transfer_rate: u32,
    pub regular_key: Option<String>,
    pub trust_lines: Vec<RpcTrustLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTrustLine {
    pub currency: String,
    pub issuer: String,
    pub balance_drops: String,
    pub limit_drops: String,
    pub frozen: bool,
    pub authorized: bool,
}

/// A transaction plus its application result, as returned by
/// `nxf_getTransaction`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTransaction {
    pub tx_id: String,
    pub account: String,
    pub sequence: u32,
    pub fee_drops: String,
    pub result: String,
    pub ledger_seq: u32,
}

/// A closed ledger header, as returned by `nxf_getLedger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcLedger {
    pub sequence: u32,
    pub hash: String,
    pub parent_hash: String,
    pub close_time: i64,
    pub tx_count: u32,
    pub total_nxf_drops: String,
}

/// A stake record's read-only projection, as returned by `nxf_getStake`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcStake {
    pub stake_id: String,
    pub owner: String,
    pub principal_drops: String,
    pub tier: String,
    pub effective_apy: f64,
    pub maturity_time: i64,
    pub matured: bool,
    pub cancelled: bool,
    pub is_flexible: bool,
    pub projected_payout_drops: String,
}

/// Node/network status returned by `nxf_getNetworkInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcNetworkInfo {
    pub node_id: String,
    pub listen_addr: String,
    pub peer_count: usize,
    pub ledger_seq: u32,
    pub protocol_version: u32,
}

/// Genesis/protocol constants returned by `nxf_getGenesisInfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcGenesisInfo {
    pub protocol: String,
    pub ticker: String,
    pub drops_per_nxf: u64,
    pub total_supply_drops: String,
    pub genesis_timestamp: i64,
    pub account_reserve_drops: String,
    pub owner_reserve_drops: String,
    pub min_fee_drops: String,
}

impl RpcGenesisInfo {
    pub fn current(genesis_timestamp: i64) -> Self {
        use nxf_core::constants::*;
        Self {
            protocol: "NXF".into(),
            ticker: "NXF".into(),
            drops_per_nxf: DROPS_PER_NXF,
            total_supply_drops: GENESIS_TOTAL_SUPPLY_DROPS.to_string(),
            genesis_timestamp,
            account_reserve_drops: ACCOUNT_RESERVE_DROPS.to_string(),
            owner_reserve_drops: OWNER_RESERVE_DROPS.to_string(),
            min_fee_drops: MIN_FEE_DROPS.to_string(),
        }
    }
}
