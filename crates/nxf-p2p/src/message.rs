use std::collections::BTreeSet;

use nxf_consensus::Proposal;
use nxf_core::account::Account;
use nxf_core::ledger_header::LedgerHeader;
use nxf_core::transaction::Transaction;
use nxf_core::types::{LedgerSeq, TxId};
use nxf_sync::{DeltaLedger, SyncStatus};
use serde::{Deserialize, Serialize};

/// The wire protocol: one JSON object per line, dispatched on `type`.
/// No libp2p framing, no protobuf — newline-delimited JSON over a plain
/// TCP socket, optionally behind TLS (a transport concern handled by the
/// listener/connector, not by this enum).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum P2pMessage {
    /// First message on a new connection: who I am and where to dial me
    /// back for `PEERS` gossip.
    Hello {
        node_id: String,
        port: u16,
        public_key_hex: Option<String>,
        protocol_version: u32,
    },
    /// Addresses this peer knows about. Recipients must filter out
    /// private/link-local/loopback addresses before adding any of these to
    /// their own connect-to list.
    Peers { addresses: Vec<String> },
    /// A signed transaction, gossiped toward pool admission on every node.
    Tx { tx: Transaction },
    /// One validator's candidate set for a consensus round.
    Proposal { proposal: Proposal },
    /// Announces that a ledger sequence closed with this agreed tx-id set.
    ConsensusOk { ledger_seq: LedgerSeq, tx_ids: BTreeSet<TxId> },
    /// Liveness check; must be answered with `Pong`.
    Ping,
    Pong,
    /// Request the current (latest) ledger header.
    LedgerReq,
    LedgerRes { header: LedgerHeader },
    /// Request the peer's sync status (tip sequence + hash).
    SyncStatusReq,
    SyncStatusRes { status: SyncStatus },
    /// Replay request for ledgers `(from, to]`.
    SyncDeltaReq { from: LedgerSeq, to: LedgerSeq },
    SyncDeltaRes { ledgers: Vec<DeltaLedger> },
    /// Full-state snapshot request, answered in chunks of at most
    /// `SYNC_DELTA_CHUNK_ACCOUNTS` accounts each.
    SyncSnapReq,
    SyncSnapRes {
        header: LedgerHeader,
        accounts: Vec<Account>,
        chunk_index: u32,
        chunk_count: u32,
    },
}

impl P2pMessage {
    /// A short label for logging, distinct from the full `Debug` dump which
    /// could otherwise flood logs with entire transaction/snapshot bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            P2pMessage::Hello { .. } => "HELLO",
            P2pMessage::Peers { .. } => "PEERS",
            P2pMessage::Tx { .. } => "TX",
            P2pMessage::Proposal { .. } => "PROPOSAL",
            P2pMessage::ConsensusOk { .. } => "CONSENSUS_OK",
            P2pMessage::Ping => "PING",
            P2pMessage::Pong => "PONG",
            P2pMessage::LedgerReq => "LEDGER_REQ",
            P2pMessage::LedgerRes { .. } => "LEDGER_RES",
            P2pMessage::SyncStatusReq => "SYNC_STATUS_REQ",
            P2pMessage::SyncStatusRes { .. } => "SYNC_STATUS_RES",
            P2pMessage::SyncDeltaReq { .. } => "SYNC_DELTA_REQ",
            P2pMessage::SyncDeltaRes { .. } => "SYNC_DELTA_RES",
            P2pMessage::SyncSnapReq => "SYNC_SNAP_REQ",
            P2pMessage::SyncSnapRes { .. } => "SYNC_SNAP_RES",
        }
    }

    /// Encode as one line of newline-terminated JSON, ready to write to a
    /// socket.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_round_trips_through_json_line() {
        let line = P2pMessage::Ping.to_line().unwrap();
        let decoded: P2pMessage = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(decoded.kind(), "PING");
    }

    #[test]
    fn peers_message_carries_addresses() {
        let msg = P2pMessage::Peers { addresses: vec!["203.0.113.5:7777".into()] };
        let line = msg.to_line().unwrap();
        assert!(line.contains("203.0.113.5:7777"));
    }
}
