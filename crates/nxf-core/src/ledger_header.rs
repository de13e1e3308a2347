use serde::{Deserialize, Serialize};

use crate::types::{Drops, LedgerSeq, Timestamp};

/// A closed ledger's header. `hash` chains to the previous header, giving the
/// ledger its append-only, tamper-evident shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerHeader {
    pub sequence: LedgerSeq,
    pub parent_hash: [u8; 32],
    pub tx_hash: [u8; 32],
    pub state_hash: [u8; 32],
    pub close_time: Timestamp,
    pub tx_count: u32,
    pub total_nxf_drops: Drops,
    pub hash: [u8; 32],
}

impl LedgerHeader {
    /// Bytes hashed (BLAKE2b-256) to produce `hash`. Excludes `hash` itself.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 32 * 3 + 8 + 4 + 8);
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.extend_from_slice(&self.parent_hash);
        buf.extend_from_slice(&self.tx_hash);
        buf.extend_from_slice(&self.state_hash);
        buf.extend_from_slice(&self.close_time.to_be_bytes());
        buf.extend_from_slice(&self.tx_count.to_be_bytes());
        buf.extend_from_slice(&self.total_nxf_drops.to_be_bytes());
        buf
    }
}
