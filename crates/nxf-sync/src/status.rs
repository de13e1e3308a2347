use nxf_core::types::LedgerSeq;
use serde::{Deserialize, Serialize};

/// A chain tip as advertised by a peer (or ourselves) over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub ledger_seq: LedgerSeq,
    pub ledger_hash: [u8; 32],
}

/// A peer's advertised status plus when we received it, for the
/// earliest-response tie-break among equally-advanced peers.
#[derive(Clone, Debug)]
pub struct PeerStatus {
    pub peer: String,
    pub status: SyncStatus,
    pub received_at: std::time::Instant,
}
