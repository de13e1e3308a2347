use nxf_core::constants::{SYNC_DELTA_CHUNK_ACCOUNTS, SYNC_DELTA_THRESHOLD};
use nxf_core::types::LedgerSeq;

use crate::status::{PeerStatus, SyncStatus};

/// What to do after comparing our tip against the network's peers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncPlan {
    /// We are at or ahead of every peer we heard from.
    UpToDate,
    /// Replay ledgers `(from, to]` from `peer`, transaction-by-transaction.
    Delta { peer: String, from: LedgerSeq, to: LedgerSeq },
    /// Too far behind to catch up by replay; install `peer`'s full account
    /// snapshot at `to` instead.
    Snapshot { peer: String, to: LedgerSeq },
}

/// Picks a sync plan from our own tip and the peer statuses gathered during
/// one status round. Among peers at the highest `ledger_seq`, the one whose
/// status arrived first wins — favoring the most responsive peer over an
/// arbitrary ordering.
pub fn plan_sync(local: SyncStatus, peers: &[PeerStatus]) -> SyncPlan {
    let ahead: Vec<&PeerStatus> = peers.iter().filter(|p| p.status.ledger_seq > local.ledger_seq).collect();
    let Some(best) = ahead.iter().max_by(|a, b| {
        a.status
            .ledger_seq
            .cmp(&b.status.ledger_seq)
            .then(b.received_at.cmp(&a.received_at))
    }) else {
        return SyncPlan::UpToDate;
    };

    let behind_by = best.status.ledger_seq.saturating_sub(local.ledger_seq);
    if behind_by as u64 > SYNC_DELTA_THRESHOLD {
        SyncPlan::Snapshot { peer: best.peer.clone(), to: best.status.ledger_seq }
    } else {
        SyncPlan::Delta { peer: best.peer.clone(), from: local.ledger_seq, to: best.status.ledger_seq }
    }
}

/// Splits `total` accounts into chunks no larger than
/// [`SYNC_DELTA_CHUNK_ACCOUNTS`], for paging a full snapshot install.
pub fn chunk_bounds(total: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + SYNC_DELTA_CHUNK_ACCOUNTS).min(total);
        out.push((start, end));
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn peer(name: &str, seq: LedgerSeq, received_at: Instant) -> PeerStatus {
        PeerStatus { peer: name.to_string(), status: SyncStatus { ledger_seq: seq, ledger_hash: [0; 32] }, received_at }
    }

    #[test]
    fn up_to_date_when_no_peer_is_ahead() {
        let local = SyncStatus { ledger_seq: 10, ledger_hash: [0; 32] };
        let now = Instant::now();
        let peers = vec![peer("a", 10, now), peer("b", 5, now)];
        assert_eq!(plan_sync(local, &peers), SyncPlan::UpToDate);
    }

    #[test]
    fn small_gap_uses_delta_replay() {
        let local = SyncStatus { ledger_seq: 100, ledger_hash: [0; 32] };
        let now = Instant::now();
        let peers = vec![peer("a", 110, now)];
        assert_eq!(plan_sync(local, &peers), SyncPlan::Delta { peer: "a".into(), from: 100, to: 110 });
    }

    #[test]
    fn large_gap_falls_back_to_snapshot() {
        let local = SyncStatus { ledger_seq: 100, ledger_hash: [0; 32] };
        let now = Instant::now();
        let peers = vec![peer("a", 1000, now)];
        assert_eq!(plan_sync(local, &peers), SyncPlan::Snapshot { peer: "a".into(), to: 1000 });
    }

    #[test]
    fn ties_on_sequence_prefer_earliest_responder() {
        let local = SyncStatus { ledger_seq: 0, ledger_hash: [0; 32] };
        let now = Instant::now();
        let earlier = now;
        let later = now + std::time::Duration::from_millis(50);
        let peers = vec![peer("slow", 10, later), peer("fast", 10, earlier)];
        assert_eq!(plan_sync(local, &peers), SyncPlan::Delta { peer: "fast".into(), from: 0, to: 10 });
    }

    #[test]
    fn chunk_bounds_splits_evenly() {
        let bounds = chunk_bounds(1_250);
        assert_eq!(bounds.first(), Some(&(0, 500)));
        assert_eq!(bounds.last(), Some(&(1_000, 1_250)));
    }
}
