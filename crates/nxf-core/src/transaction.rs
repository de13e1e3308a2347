use serde::{Deserialize, Serialize};

use crate::account::SignerEntry;
use crate::types::{AccountId, Amount, CurrencyCode, Drops, IouDrops, PublicKey, Sequence, Signature, TxId};

// ── Stake tiers ──────────────────────────────────────────────────────────────

/// A staking lock-duration tier. Ordered shortest to longest; the discriminant
/// doubles as the tier's index into the tier table in `nxf-staking`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[repr(u8)]
pub enum StakeTier {
    Flexible = 0,
    Days30 = 1,
    Days90 = 2,
    Days180 = 3,
    Days365 = 4,
}

impl StakeTier {
    pub const fn lock_duration_secs(self) -> i64 {
        match self {
            StakeTier::Flexible => 0,
            StakeTier::Days30 => 30 * 86_400,
            StakeTier::Days90 => 90 * 86_400,
            StakeTier::Days180 => 180 * 86_400,
            StakeTier::Days365 => 365 * 86_400,
        }
    }

    pub const fn base_apy(self) -> f64 {
        match self {
            StakeTier::Flexible => 0.02,
            StakeTier::Days30 => 0.05,
            StakeTier::Days90 => 0.08,
            StakeTier::Days180 => 0.12,
            StakeTier::Days365 => 0.15,
        }
    }

    pub const ALL: [StakeTier; 5] = [
        StakeTier::Flexible,
        StakeTier::Days30,
        StakeTier::Days90,
        StakeTier::Days180,
        StakeTier::Days365,
    ];
}

// ── Transaction kind payloads ──────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustSetFields {
    pub currency: CurrencyCode,
    pub issuer: AccountId,
    pub limit: IouDrops,
    pub quality_in: Option<u64>,
    pub quality_out: Option<u64>,
    pub set_auth: bool,
    pub set_no_ripple: bool,
    pub clear_no_ripple: bool,
    pub set_freeze: bool,
    pub clear_freeze: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountSetFields {
    pub set_flags: u32,
    pub clear_flags: u32,
    pub transfer_rate: Option<u64>,
    pub deposit_preauth_add: Option<AccountId>,
    pub deposit_preauth_remove: Option<AccountId>,
}

/// Every state-changing operation a signed transaction may carry. Exactly
/// one kind is present per transaction (no batched multi-action form).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TxKind {
    Payment {
        destination: AccountId,
        amount: Amount,
        /// Present only for cross-currency payments; bounds slippage.
        send_max: Option<Amount>,
        destination_tag: Option<u32>,
        partial_payment_ok: bool,
    },
    TrustSet(TrustSetFields),
    /// Parsed and validated for canonical form, but the DEX order-book
    /// subsystem is out of scope: `apply_transaction` rejects these with
    /// `TxResult::TecNoDst` rather than matching an order.
    OfferCreate {
        taker_pays: Amount,
        taker_gets: Amount,
    },
    OfferCancel {
        offer_sequence: Sequence,
    },
    AccountSet(AccountSetFields),
    SetRegularKey {
        regular_key: Option<PublicKey>,
    },
    SignerListSet {
        quorum: u32,
        signers: Vec<SignerEntry>,
    },
    AccountDelete {
        destination: AccountId,
    },
    /// Reserves a block of sequence-number tickets. Ticket creation and
    /// owner-count accounting are implemented; ticket-based sequence
    /// substitution on other transactions is not (see DESIGN.md).
    TicketCreate {
        count: u32,
    },
    Stake {
        tier: StakeTier,
        amount: Drops,
    },
    Unstake {
        stake_id: TxId,
    },
}

impl TxKind {
    /// Stable numeric tag used as the first field of the signing blob.
    pub fn tag(&self) -> u8 {
        match self {
            TxKind::Payment { .. } => 0,
            TxKind::TrustSet(_) => 1,
            TxKind::OfferCreate { .. } => 2,
            TxKind::OfferCancel { .. } => 3,
            TxKind::AccountSet(_) => 4,
            TxKind::SetRegularKey { .. } => 5,
            TxKind::SignerListSet { .. } => 6,
            TxKind::AccountDelete { .. } => 7,
            TxKind::TicketCreate { .. } => 8,
            TxKind::Stake { .. } => 9,
            TxKind::Unstake { .. } => 10,
        }
    }
}

/// A fully-formed, signed transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: TxId,
    pub account: AccountId,
    pub sequence: Sequence,
    pub fee: Drops,
    pub memo: Option<String>,
    pub source_tag: Option<u32>,
    pub signing_public_key: PublicKey,
    pub signature: Signature,
    pub kind: TxKind,
}

impl Transaction {
    /// The canonical signing blob: every field except `tx_id` and
    /// `signature`, in the fixed order the wire protocol specifies. Two
    /// transactions with identical fields always produce identical bytes.
    pub fn signing_blob(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        buf.push(self.kind.tag());
        buf.extend_from_slice(self.account.as_bytes());
        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.extend_from_slice(&self.fee.to_be_bytes());
        push_opt_u32(&mut buf, self.source_tag);
        push_opt_str(&mut buf, self.memo.as_deref());
        buf.extend_from_slice(self.signing_public_key.as_bytes());
        push_kind(&mut buf, &self.kind);
        buf
    }
}

fn push_u8_len_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.push(bytes.len() as u8);
    buf.extend_from_slice(bytes);
}

fn push_opt_u32(buf: &mut Vec<u8>, v: Option<u32>) {
    match v {
        Some(n) => {
            buf.push(1);
            buf.extend_from_slice(&n.to_be_bytes());
        }
        None => buf.push(0),
    }
}

fn push_opt_u64(buf: &mut Vec<u8>, v: Option<u64>) {
    match v {
        Some(n) => {
            buf.push(1);
            buf.extend_from_slice(&n.to_be_bytes());
        }
        None => buf.push(0),
    }
}

fn push_opt_account(buf: &mut Vec<u8>, v: Option<AccountId>) {
    match v {
        Some(id) => {
            buf.push(1);
            buf.extend_from_slice(id.as_bytes());
        }
        None => buf.push(0),
    }
}

fn push_opt_str(buf: &mut Vec<u8>, v: Option<&str>) {
    match v {
        Some(s) => {
            buf.push(1);
            let bytes = s.as_bytes();
            buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
            buf.extend_from_slice(bytes);
        }
        None => buf.push(0),
    }
}

fn push_amount(buf: &mut Vec<u8>, amount: &Amount) {
    match amount {
        Amount::Native(drops) => {
            buf.push(0);
            buf.extend_from_slice(&drops.to_be_bytes());
        }
        Amount::Iou { drops, currency, issuer } => {
            buf.push(1);
            buf.extend_from_slice(&drops.to_be_bytes());
            push_u8_len_bytes(buf, currency.as_bytes());
            buf.extend_from_slice(issuer.as_bytes());
        }
    }
}

fn push_kind(buf: &mut Vec<u8>, kind: &TxKind) {
    match kind {
        TxKind::Payment { destination, amount, send_max, destination_tag, partial_payment_ok } => {
            buf.extend_from_slice(destination.as_bytes());
            push_amount(buf, amount);
            match send_max {
                Some(a) => {
                    buf.push(1);
                    push_amount(buf, a);
                }
                None => buf.push(0),
            }
            push_opt_u32(buf, *destination_tag);
            buf.push(*partial_payment_ok as u8);
        }
        TxKind::TrustSet(f) => {
            push_u8_len_bytes(buf, f.currency.as_bytes());
            buf.extend_from_slice(f.issuer.as_bytes());
            buf.extend_from_slice(&f.limit.to_be_bytes());
            push_opt_u64(buf, f.quality_in);
            push_opt_u64(buf, f.quality_out);
            buf.push(f.set_auth as u8);
            buf.push(f.set_no_ripple as u8);
            buf.push(f.clear_no_ripple as u8);
            buf.push(f.set_freeze as u8);
            buf.push(f.clear_freeze as u8);
        }
        TxKind::OfferCreate { taker_pays, taker_gets } => {
            push_amount(buf, taker_pays);
            push_amount(buf, taker_gets);
        }
        TxKind::OfferCancel { offer_sequence } => {
            buf.extend_from_slice(&offer_sequence.to_be_bytes());
        }
        TxKind::AccountSet(f) => {
            buf.extend_from_slice(&f.set_flags.to_be_bytes());
            buf.extend_from_slice(&f.clear_flags.to_be_bytes());
            match f.transfer_rate {
                Some(r) => {
                    buf.push(1);
                    buf.extend_from_slice(&r.to_be_bytes());
                }
                None => buf.push(0),
            }
            push_opt_account(buf, f.deposit_preauth_add);
            push_opt_account(buf, f.deposit_preauth_remove);
        }
        TxKind::SetRegularKey { regular_key } => match regular_key {
            Some(k) => {
                buf.push(1);
                push_u8_len_bytes(buf, k.as_bytes());
            }
            None => buf.push(0),
        },
        TxKind::SignerListSet { quorum, signers } => {
            buf.extend_from_slice(&quorum.to_be_bytes());
            buf.push(signers.len() as u8);
            for s in signers {
                buf.extend_from_slice(s.account.as_bytes());
                buf.extend_from_slice(&s.weight.to_be_bytes());
            }
        }
        TxKind::AccountDelete { destination } => {
            buf.extend_from_slice(destination.as_bytes());
        }
        TxKind::TicketCreate { count } => {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        TxKind::Stake { tier, amount } => {
            buf.push(*tier as u8);
            buf.extend_from_slice(&amount.to_be_bytes());
        }
        TxKind::Unstake { stake_id } => {
            buf.extend_from_slice(stake_id.as_bytes());
        }
    }
}

/// The public result contract between the validator and the ledger. Exact
/// numeric values are part of the wire contract; every conformant node must
/// agree on them.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
#[repr(i32)]
pub enum TxResult {
    TesSuccess = 0,
    TefPastSeq = 90,
    TefBadSeq = 91,
    TefBadSignature = 92,
    TemMalformed = 99,
    TecUnfunded = 101,
    TecNoLine = 103,
    TecFrozen = 104,
    TecRequireAuth = 105,
    TecPartialPayment = 106,
    TecStakeLocked = 108,
    TecDuplicate = 109,
    TecNoDst = 130,
    TecDstTagNeeded = 131,
    TecGlobalFreeze = 132,
    TecBadSig = 133,
    TecInsufReserve = 140,
    TecHasObligations = 141,
}

impl TxResult {
    pub fn is_success(self) -> bool {
        matches!(self, TxResult::TesSuccess)
    }
}

impl std::fmt::Display for TxResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, CurrencyCode, PublicKey, Signature, TxId};

    fn base_tx(kind: TxKind) -> Transaction {
        Transaction {
            tx_id: TxId::from_bytes([0u8; 32]),
            account: AccountId::from_bytes([1u8; 20]),
            sequence: 1,
            fee: 1_000,
            memo: None,
            source_tag: None,
            signing_public_key: PublicKey(vec![2u8; 33]),
            signature: Signature(vec![]),
            kind,
        }
    }

    fn trust_set(quality_in: Option<u64>, quality_out: Option<u64>) -> Transaction {
        base_tx(TxKind::TrustSet(TrustSetFields {
            currency: CurrencyCode::new("USD").unwrap(),
            issuer: AccountId::from_bytes([9u8; 20]),
            limit: 1_000,
            quality_in,
            quality_out,
            set_auth: false,
            set_no_ripple: false,
            clear_no_ripple: false,
            set_freeze: false,
            clear_freeze: false,
        }))
    }

    #[test]
    fn trust_set_quality_fields_bind_into_the_signing_blob() {
        let a = trust_set(None, None);
        let b = trust_set(Some(500_000_000), None);
        let c = trust_set(None, Some(500_000_000));
        assert_ne!(a.signing_blob(), b.signing_blob());
        assert_ne!(a.signing_blob(), c.signing_blob());
        assert_ne!(b.signing_blob(), c.signing_blob());
    }

    fn account_set(add: Option<AccountId>, remove: Option<AccountId>) -> Transaction {
        base_tx(TxKind::AccountSet(AccountSetFields {
            set_flags: 0,
            clear_flags: 0,
            transfer_rate: None,
            deposit_preauth_add: add,
            deposit_preauth_remove: remove,
        }))
    }

    #[test]
    fn account_set_preauth_fields_bind_into_the_signing_blob() {
        let neither = account_set(None, None);
        let add = account_set(Some(AccountId::from_bytes([4u8; 20])), None);
        let remove = account_set(None, Some(AccountId::from_bytes([4u8; 20])));
        let different_target = account_set(Some(AccountId::from_bytes([5u8; 20])), None);
        assert_ne!(neither.signing_blob(), add.signing_blob());
        assert_ne!(neither.signing_blob(), remove.signing_blob());
        assert_ne!(add.signing_blob(), remove.signing_blob());
        assert_ne!(add.signing_blob(), different_target.signing_blob());
    }
}
