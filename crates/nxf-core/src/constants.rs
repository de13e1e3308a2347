//! Protocol constants.
//!
//! Base unit: drop (1 NXF = 100,000,000 drops).

// ── Supply ───────────────────────────────────────────────────────────────────

/// Drops per whole NXF.
pub const DROPS_PER_NXF: u64 = 100_000_000;

/// Fractional digits carried by the native unit (matches `DROPS_PER_NXF`).
pub const NXF_DECIMALS: u32 = 8;

/// Total supply minted at genesis, in drops (100,000,000,000 NXF).
pub const GENESIS_TOTAL_SUPPLY_DROPS: u128 = 100_000_000_000 * DROPS_PER_NXF as u128;

// ── Addressing ────────────────────────────────────────────────────────────────

/// Base58Check version byte for account addresses.
pub const ADDRESS_VERSION_BYTE: u8 = 0x23;

// ── Reserves & fees ───────────────────────────────────────────────────────────

/// Base account reserve (drops). An account's native balance may never fall
/// below this plus its owner reserve.
pub const ACCOUNT_RESERVE_DROPS: u64 = 20 * DROPS_PER_NXF;

/// Additional reserve charged per owned ledger object (trust line, stake,
/// signer list, ticket), in drops.
pub const OWNER_RESERVE_DROPS: u64 = 5 * DROPS_PER_NXF;

/// Minimum network transaction fee, in drops.
pub const MIN_FEE_DROPS: u64 = 1_000; // 0.00001 NXF

/// Maximum transfer rate a gateway may set (200%, expressed as parts per
/// billion to keep the check integer-exact: 1.0 == 1_000_000_000).
pub const TRANSFER_RATE_SCALE: u64 = 1_000_000_000;
pub const MAX_TRANSFER_RATE: u64 = 2 * TRANSFER_RATE_SCALE;

// ── Consensus (RPCA) ───────────────────────────────────────────────────────────

/// Wall-clock interval between ledger close attempts, seconds.
pub const CONSENSUS_INTERVAL_SECS: u64 = 10;

/// How long the engine waits to collect peer proposals before round 0.
pub const PROPOSAL_WAIT_SECS: f64 = 2.0;

/// Round 0 agreement threshold (50%).
pub const CONSENSUS_INITIAL_THRESHOLD: f64 = 0.50;

/// Final-round agreement threshold (80%).
pub const CONSENSUS_FINAL_THRESHOLD: f64 = 0.80;

/// Maximum number of escalation rounds before the ledger closes on whatever
/// the final round reached (or aborts, per the round machine's own rules).
pub const CONSENSUS_MAX_ROUNDS: u32 = 4;

// ── Staking ────────────────────────────────────────────────────────────────────

/// Stake tiers, indexed 0..=4.
pub const STAKE_TIER_COUNT: usize = 5;

pub const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Minimum amount (drops) that may be placed into a new stake.
pub const MIN_STAKE_AMOUNT_DROPS: u64 = DROPS_PER_NXF; // 1 NXF

pub const TARGET_STAKE_RATIO: f64 = 0.30;
pub const DEMAND_SENSITIVITY: f64 = 3.0;
pub const MIN_DEMAND_MULTIPLIER: f64 = 0.5;
pub const MAX_DEMAND_MULTIPLIER: f64 = 2.0;

pub const BASE_INTEREST_PENALTY: f64 = 0.50;
pub const INTEREST_PENALTY_SCALE: f64 = 0.40;
pub const BASE_PRINCIPAL_PENALTY: f64 = 0.02;
pub const PRINCIPAL_PENALTY_SCALE: f64 = 0.08;

// ── Sync protocol ──────────────────────────────────────────────────────────────

/// Above this many diverging accounts, request a full snapshot instead of a delta.
pub const SYNC_DELTA_THRESHOLD: u64 = 50;

pub const SYNC_STATUS_TIMEOUT_SECS: f64 = 5.0;
pub const SYNC_DATA_TIMEOUT_SECS: f64 = 30.0;
pub const SYNC_COOLDOWN_SECS: f64 = 15.0;
pub const SYNC_DELTA_CHUNK_ACCOUNTS: usize = 500;

// ── P2P ────────────────────────────────────────────────────────────────────────

/// Bound on the gossip dedup set (tx ids and proposal keys each get one).
pub const P2P_SEEN_CACHE_CAPACITY: usize = 10_000;

/// Current wire protocol version, sent in HELLO.
pub const PROTOCOL_VERSION: u32 = 1;
