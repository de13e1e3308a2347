use thiserror::Error;

/// Internal error type propagated with `?` across the workspace. This is
/// distinct from `TxResult` (`transaction.rs`), which is the consensus-visible
/// outcome of applying a transaction and is never allowed to leak internal
/// detail (storage paths, exact balances) back to an RPC client.
#[derive(Debug, Error)]
pub enum NxfError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction id: {0}")]
    InvalidTxId(String),

    #[error("invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("malformed key material: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("ledger is not in a consistent state: {0}")]
    Inconsistent(String),

    #[error("sync protocol error: {0}")]
    Sync(String),

    #[error("consensus error: {0}")]
    Consensus(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}
