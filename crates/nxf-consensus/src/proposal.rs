use std::collections::BTreeSet;

use nxf_crypto::hash::blake2b_256;
use serde::{Deserialize, Serialize};

use nxf_core::types::{AccountId, LedgerSeq, Signature, TxId};

/// A single validator's view of the candidate set for a given ledger
/// sequence and round: "these are the tx-ids I currently hold."
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub validator_id: AccountId,
    pub ledger_seq: LedgerSeq,
    pub round: u32,
    pub tx_ids: BTreeSet<TxId>,
    pub signature: Option<Signature>,
}

impl Proposal {
    pub fn unsigned(validator_id: AccountId, ledger_seq: LedgerSeq, round: u32, tx_ids: BTreeSet<TxId>) -> Self {
        Self { validator_id, ledger_seq, round, tx_ids, signature: None }
    }

    /// BLAKE2b-256 over `(validator_id, ledger_seq, sorted tx_ids, round)`.
    /// `tx_ids` is already a `BTreeSet`, so its iteration order is the
    /// canonical sort — no separate sort step is needed here.
    pub fn hash(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(20 + 4 + 4 + self.tx_ids.len() * 32);
        buf.extend_from_slice(self.validator_id.as_bytes());
        buf.extend_from_slice(&self.ledger_seq.to_be_bytes());
        buf.extend_from_slice(&self.round.to_be_bytes());
        for id in &self.tx_ids {
            buf.extend_from_slice(id.as_bytes());
        }
        blake2b_256(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_under_tx_id_reordering() {
        let v = AccountId::from_bytes([1; 20]);
        let a = TxId::from_bytes([2; 32]);
        let b = TxId::from_bytes([3; 32]);
        let p1 = Proposal::unsigned(v, 1, 0, BTreeSet::from([a, b]));
        let p2 = Proposal::unsigned(v, 1, 0, BTreeSet::from([b, a]));
        assert_eq!(p1.hash(), p2.hash());
    }

    #[test]
    fn hash_changes_with_round() {
        let v = AccountId::from_bytes([1; 20]);
        let a = TxId::from_bytes([2; 32]);
        let p1 = Proposal::unsigned(v, 1, 0, BTreeSet::from([a]));
        let p2 = Proposal::unsigned(v, 1, 1, BTreeSet::from([a]));
        assert_ne!(p1.hash(), p2.hash());
    }
}
