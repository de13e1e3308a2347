//! Core account and trust-line types.
//!
//! - [`Account`] — the full state of a ledger account.
//! - [`TrustLine`] — a holder/issuer IOU credit relationship.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{ACCOUNT_RESERVE_DROPS, OWNER_RESERVE_DROPS, TRANSFER_RATE_SCALE};
use crate::types::{AccountId, CurrencyCode, Drops, IouDrops, PublicKey, Sequence};

/// Key identifying a trust line within an account: the issued currency and
/// the issuing gateway's address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Debug)]
pub struct TrustLineKey {
    pub currency: CurrencyCodeKey,
    pub issuer: AccountId,
}

/// `CurrencyCode` owns a `Vec<u8>` and so is not `Copy`; the map key instead
/// stores the same bytes inline. 20 bytes covers every currency code the
/// type system allows.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurrencyCodeKey {
    len: u8,
    bytes: [u8; 20],
}

impl std::fmt::Debug for CurrencyCodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", CurrencyCode::from(*self))
    }
}

impl From<&CurrencyCode> for CurrencyCodeKey {
    fn from(code: &CurrencyCode) -> Self {
        let src = code.as_bytes();
        let mut bytes = [0u8; 20];
        bytes[..src.len()].copy_from_slice(src);
        Self { len: src.len() as u8, bytes }
    }
}

impl From<CurrencyCodeKey> for CurrencyCode {
    fn from(key: CurrencyCodeKey) -> Self {
        let s = std::str::from_utf8(&key.bytes[..key.len as usize])
            .unwrap_or("???")
            .to_string();
        // The key was produced by a validated `CurrencyCode`, so this
        // round-trip cannot fail except via the unreachable fallback above.
        CurrencyCode::new(&s).unwrap_or_else(|_| CurrencyCode::new("???").unwrap())
    }
}

/// A holder's credit relationship with a single gateway for a single
/// currency. Balance is signed from the holder's point of view: positive
/// means the issuer owes the holder, negative means the holder owes the
/// issuer (possible under rippling through the holder's own issuance).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustLine {
    pub balance: IouDrops,
    /// Maximum balance this holder is willing to accept from the issuer.
    pub limit: IouDrops,
    /// The limit the issuer has extended back to the holder, if any.
    pub limit_peer: IouDrops,
    pub no_ripple: bool,
    pub frozen: bool,
    pub authorized: bool,
    /// Quality applied to value crossing this line, parts per billion;
    /// `TRANSFER_RATE_SCALE` denotes 1.0 (no adjustment).
    pub quality_in: u64,
    pub quality_out: u64,
}

impl TrustLine {
    pub fn new(limit: IouDrops) -> Self {
        Self {
            balance: 0,
            limit,
            limit_peer: 0,
            no_ripple: false,
            frozen: false,
            authorized: false,
            quality_in: TRANSFER_RATE_SCALE,
            quality_out: TRANSFER_RATE_SCALE,
        }
    }
}

/// Account-level flags. Kept as individual bits on a `u32` rather than a
/// bitflags-crate type so the wire/storage encoding is a single plain
/// integer with no extra dependency.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct AccountFlags(pub u32);

impl AccountFlags {
    pub const REQUIRE_AUTH: u32 = 0b0000_0001;
    pub const REQUIRE_DEST_TAG: u32 = 0b0000_0010;
    pub const GLOBAL_FREEZE: u32 = 0b0000_0100;
    pub const DISABLE_MASTER: u32 = 0b0000_1000;
    pub const DEFAULT_RIPPLE: u32 = 0b0001_0000;
    pub const DEPOSIT_AUTH: u32 = 0b0010_0000;

    pub fn has(&self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    pub fn set(&mut self, bit: u32, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// A weighted signer entry in a multisig signer list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignerEntry {
    pub account: AccountId,
    pub weight: u16,
}

/// An installed multisig policy: a quorum and the weighted signer set that
/// must meet it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignerList {
    pub quorum: u32,
    pub signers: Vec<SignerEntry>,
}

/// A ledger account: the unit the state machine mutates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub master_key: PublicKey,
    pub regular_key: Option<PublicKey>,
    pub balance: Drops,
    pub sequence: Sequence,
    pub flags: AccountFlags,
    /// Multiplier applied to outgoing IOU payments issued by this account,
    /// parts per billion (`TRANSFER_RATE_SCALE` == 1.0, i.e. no fee).
    pub transfer_rate: u64,
    pub signer_list: Option<SignerList>,
    /// Number of owned ledger objects (trust lines, stakes, signer lists,
    /// tickets) — each adds one `OWNER_RESERVE_DROPS` to the required
    /// reserve.
    pub owner_count: u32,
    /// Addresses preauthorized to deposit to this account when
    /// `DEPOSIT_AUTH` is set.
    pub deposit_preauth: Vec<AccountId>,
    pub trust_lines: BTreeMap<TrustLineKey, TrustLine>,
}

impl Account {
    pub fn new(account_id: AccountId, master_key: PublicKey, balance: Drops) -> Self {
        Self {
            account_id,
            master_key,
            regular_key: None,
            balance,
            sequence: 1,
            flags: AccountFlags::default(),
            transfer_rate: TRANSFER_RATE_SCALE,
            signer_list: None,
            owner_count: 0,
            deposit_preauth: Vec::new(),
            trust_lines: BTreeMap::new(),
        }
    }

    /// Native drops required to remain above reserve.
    pub fn required_reserve(&self) -> Drops {
        ACCOUNT_RESERVE_DROPS + self.owner_count as Drops * OWNER_RESERVE_DROPS
    }

    /// Native drops this account could spend while staying above reserve.
    pub fn spendable_balance(&self) -> Drops {
        self.balance.saturating_sub(self.required_reserve())
    }

    pub fn trust_line(&self, currency: &CurrencyCode, issuer: &AccountId) -> Option<&TrustLine> {
        self.trust_lines.get(&TrustLineKey {
            currency: CurrencyCodeKey::from(currency),
            issuer: *issuer,
        })
    }

    pub fn trust_line_mut(
        &mut self,
        currency: &CurrencyCode,
        issuer: &AccountId,
    ) -> Option<&mut TrustLine> {
        self.trust_lines.get_mut(&TrustLineKey {
            currency: CurrencyCodeKey::from(currency),
            issuer: *issuer,
        })
    }
}
