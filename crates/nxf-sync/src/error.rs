use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("delta chunk for ledger {0} arrived out of order")]
    OutOfOrder(nxf_core::types::LedgerSeq),

    #[error("header at sequence {0} does not chain to its parent")]
    BrokenChain(nxf_core::types::LedgerSeq),

    #[error("header at sequence {seq} hash does not match its contents")]
    HashMismatch { seq: nxf_core::types::LedgerSeq },

    #[error("peer {0} is behind or at our own sequence; nothing to sync")]
    NothingToSync(String),

    #[error(transparent)]
    Ledger(#[from] nxf_core::NxfError),
}
