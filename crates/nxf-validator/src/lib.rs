//! Transaction validation: the predicate that gates pool admission and is
//! re-invoked (never trusted) by the ledger-apply path. See `validate`.

pub mod view;

pub use view::LedgerView;

use nxf_core::account::Account;
use nxf_core::constants::{MAX_TRANSFER_RATE, MIN_FEE_DROPS, TRANSFER_RATE_SCALE};
use nxf_core::transaction::{Transaction, TxKind, TxResult};
use nxf_core::types::Amount;
use nxf_crypto::signing::verify_transaction;

/// Stateless checks: signature validity, field ranges, and fee floor. These
/// require no ledger state and can run before a node even has the signer's
/// account loaded.
pub fn validate_stateless(tx: &Transaction) -> Result<(), TxResult> {
    if tx.fee < MIN_FEE_DROPS {
        return Err(TxResult::TemMalformed);
    }
    if tx.sequence < 1 {
        return Err(TxResult::TemMalformed);
    }
    if verify_transaction(tx).is_err() {
        return Err(TxResult::TefBadSignature);
    }
    validate_kind_fields(&tx.kind)
}

fn validate_kind_fields(kind: &TxKind) -> Result<(), TxResult> {
    match kind {
        TxKind::Payment { amount, send_max, .. } => {
            if amount.is_zero() || amount.is_negative() {
                return Err(TxResult::TemMalformed);
            }
            if let Some(max) = send_max {
                if max.is_zero() || max.is_negative() {
                    return Err(TxResult::TemMalformed);
                }
            }
            Ok(())
        }
        TxKind::TrustSet(f) => {
            if f.limit < 0 {
                return Err(TxResult::TemMalformed);
            }
            Ok(())
        }
        TxKind::AccountSet(f) => {
            if let Some(rate) = f.transfer_rate {
                if !(TRANSFER_RATE_SCALE..=MAX_TRANSFER_RATE).contains(&rate) {
                    return Err(TxResult::TemMalformed);
                }
            }
            Ok(())
        }
        TxKind::SignerListSet { quorum, signers } => {
            if signers.is_empty() && *quorum != 0 {
                return Err(TxResult::TemMalformed);
            }
            let total_weight: u32 = signers.iter().map(|s| s.weight as u32).sum();
            if *quorum > total_weight {
                return Err(TxResult::TemMalformed);
            }
            Ok(())
        }
        TxKind::TicketCreate { count } => {
            if *count == 0 {
                return Err(TxResult::TemMalformed);
            }
            Ok(())
        }
        TxKind::Stake { amount, .. } => {
            if *amount == 0 {
                return Err(TxResult::TemMalformed);
            }
            Ok(())
        }
        TxKind::OfferCreate { taker_pays, taker_gets } => {
            if taker_pays.is_zero() || taker_gets.is_zero() {
                return Err(TxResult::TemMalformed);
            }
            Ok(())
        }
        TxKind::OfferCancel { .. }
        | TxKind::SetRegularKey { .. }
        | TxKind::AccountDelete { .. }
        | TxKind::Unstake { .. } => Ok(()),
    }
}

/// Stateful checks: signer exists, sequence matches exactly, native balance
/// covers the debit plus fee, and (for IOU payments) the relevant trust
/// lines exist and are not already at their limit. This mirrors, but does
/// not replace, the ledger-apply path's own authoritative checks.
pub fn validate_stateful(tx: &Transaction, view: &dyn LedgerView) -> Result<(), TxResult> {
    if view.is_applied(&tx.tx_id) {
        return Err(TxResult::TecDuplicate);
    }

    let signer = view.account(&tx.account).ok_or(TxResult::TecUnfunded)?;

    if tx.sequence < signer.sequence {
        return Err(TxResult::TefPastSeq);
    }
    if tx.sequence > signer.sequence {
        return Err(TxResult::TefBadSeq);
    }

    check_funding(tx, &signer, view)
}

fn check_funding(tx: &Transaction, signer: &Account, view: &dyn LedgerView) -> Result<(), TxResult> {
    match &tx.kind {
        TxKind::Payment { amount, destination, .. } => match amount {
            Amount::Native(drops) => {
                let total = drops.saturating_add(tx.fee);
                if signer.balance < total {
                    return Err(TxResult::TecUnfunded);
                }
                Ok(())
            }
            Amount::Iou { currency, issuer, .. } => {
                if signer.balance < tx.fee {
                    return Err(TxResult::TecUnfunded);
                }
                if signer.account_id != *issuer && view.trust_line(&tx.account, currency, issuer).is_none() {
                    return Err(TxResult::TecNoLine);
                }
                if *destination != *issuer && view.trust_line(destination, currency, issuer).is_none() {
                    return Err(TxResult::TecNoLine);
                }
                Ok(())
            }
        },
        TxKind::Stake { amount, .. } => {
            let total = amount.saturating_add(tx.fee);
            if signer.balance < total {
                return Err(TxResult::TecUnfunded);
            }
            Ok(())
        }
        _ => {
            if signer.balance < tx.fee {
                return Err(TxResult::TecUnfunded);
            }
            Ok(())
        }
    }
}

/// Full predicate used at pool-admission time: stateless then stateful.
pub fn validate(tx: &Transaction, view: &dyn LedgerView) -> Result<(), TxResult> {
    validate_stateless(tx)?;
    validate_stateful(tx, view)
}

/// Map any internal error/result to a client-safe message: only the result
/// category leaks, never balances, sequences, or remaining amounts. Every
/// RPC handler funnels rejected transactions through this rather than
/// building ad hoc strings at each call site.
pub fn sanitize_for_client(result: TxResult) -> String {
    match result {
        TxResult::TesSuccess => "success".to_string(),
        TxResult::TefPastSeq | TxResult::TefBadSeq => "invalid sequence".to_string(),
        TxResult::TefBadSignature => "invalid signature".to_string(),
        TxResult::TemMalformed => "malformed transaction".to_string(),
        TxResult::TecUnfunded => "insufficient funds".to_string(),
        TxResult::TecNoLine => "no trust line".to_string(),
        TxResult::TecFrozen => "line frozen".to_string(),
        TxResult::TecRequireAuth => "authorization required".to_string(),
        TxResult::TecPartialPayment => "partial payment".to_string(),
        TxResult::TecStakeLocked => "stake locked".to_string(),
        TxResult::TecDuplicate => "duplicate transaction".to_string(),
        TxResult::TecNoDst => "destination unavailable".to_string(),
        TxResult::TecDstTagNeeded => "destination tag required".to_string(),
        TxResult::TecGlobalFreeze => "currency globally frozen".to_string(),
        TxResult::TecBadSig => "bad signature".to_string(),
        TxResult::TecInsufReserve => "insufficient reserve".to_string(),
        TxResult::TecHasObligations => "account has obligations".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxf_core::account::TrustLine;
    use nxf_core::types::{AccountId, CurrencyCode, TxId};
    use nxf_crypto::keypair::KeyPair;
    use nxf_crypto::signing::{sign_transaction, tx_id_from_signed};
    use std::collections::HashMap;

    struct MockView {
        accounts: HashMap<AccountId, Account>,
        applied: std::collections::HashSet<TxId>,
    }

    impl LedgerView for MockView {
        fn account(&self, id: &AccountId) -> Option<Account> {
            self.accounts.get(id).cloned()
        }
        fn trust_line(&self, holder: &AccountId, currency: &CurrencyCode, issuer: &AccountId) -> Option<TrustLine> {
            self.accounts.get(holder)?.trust_line(currency, issuer).cloned()
        }
        fn is_applied(&self, tx_id: &TxId) -> bool {
            self.applied.contains(tx_id)
        }
    }

    fn build_payment(kp: &KeyPair, sequence: u32, amount: u64, fee: u64) -> Transaction {
        let mut tx = Transaction {
            tx_id: TxId::from_bytes([0; 32]),
            account: kp.account_id,
            sequence,
            fee,
            memo: None,
            source_tag: None,
            signing_public_key: kp.public_key.clone(),
            signature: nxf_core::types::Signature(vec![]),
            kind: TxKind::Payment {
                destination: AccountId::from_bytes([9; 20]),
                amount: Amount::Native(amount),
                send_max: None,
                destination_tag: None,
                partial_payment_ok: false,
            },
        };
        tx.signature = sign_transaction(kp, &tx);
        tx.tx_id = tx_id_from_signed(&tx);
        tx
    }

    #[test]
    fn fresh_wallet_cannot_spend() {
        let kp = KeyPair::generate();
        let tx = build_payment(&kp, 1, 100_000_000, 1_000);
        let mut accounts = HashMap::new();
        accounts.insert(kp.account_id, Account::new(kp.account_id, kp.public_key.clone(), 0));
        // sequence defaults to 1, matching the account used to build `tx`.
        let view = MockView { accounts, applied: Default::default() };
        assert_eq!(validate(&tx, &view), Err(TxResult::TecUnfunded));
    }

    #[test]
    fn duplicate_is_rejected() {
        let kp = KeyPair::generate();
        let tx = build_payment(&kp, 1, 100, 1_000);
        let mut accounts = HashMap::new();
        accounts.insert(kp.account_id, Account::new(kp.account_id, kp.public_key.clone(), 1_000_000));
        let mut applied = std::collections::HashSet::new();
        applied.insert(tx.tx_id);
        let view = MockView { accounts, applied };
        assert_eq!(validate(&tx, &view), Err(TxResult::TecDuplicate));
    }

    #[test]
    fn bad_sequence_rejected() {
        let kp = KeyPair::generate();
        let tx = build_payment(&kp, 5, 100, 1_000);
        let mut accounts = HashMap::new();
        accounts.insert(kp.account_id, Account::new(kp.account_id, kp.public_key.clone(), 1_000_000));
        let view = MockView { accounts, applied: Default::default() };
        assert_eq!(validate(&tx, &view), Err(TxResult::TefBadSeq));
    }

    #[test]
    fn well_formed_payment_passes() {
        let kp = KeyPair::generate();
        let tx = build_payment(&kp, 1, 100, 1_000);
        let mut accounts = HashMap::new();
        let acc = Account::new(kp.account_id, kp.public_key.clone(), 1_000_000);
        accounts.insert(kp.account_id, acc);
        let view = MockView { accounts, applied: Default::default() };
        assert_eq!(validate(&tx, &view), Ok(()));
    }
}
