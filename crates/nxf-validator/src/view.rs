use nxf_core::account::{Account, TrustLine};
use nxf_core::types::{AccountId, CurrencyCode, TxId};

/// Read-only view of ledger state the validator needs to run its stateful
/// checks. Implemented by `nxf-ledger`'s engine so the exact same predicate
/// runs from the pool-admission path and is re-invoked (never trusted) by
/// the ledger-apply path — the ledger apply path remains the sole source of
/// truth for mutation.
pub trait LedgerView {
    fn account(&self, id: &AccountId) -> Option<Account>;
    fn trust_line(&self, holder: &AccountId, currency: &CurrencyCode, issuer: &AccountId) -> Option<TrustLine>;
    fn is_applied(&self, tx_id: &TxId) -> bool;
}
