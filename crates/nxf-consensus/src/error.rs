use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("proposal from unknown validator {0}")]
    UnknownValidator(String),

    #[error("proposal signature invalid for validator {0}")]
    InvalidSignature(String),

    #[error("proposal references a ledger sequence {got} but this round is for {expected}")]
    WrongLedgerSeq { expected: u32, got: u32 },
}
