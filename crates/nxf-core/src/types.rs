use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NxfError;

/// Native-currency amount, expressed in drops (1 NXF = 100_000_000 drops).
pub type Drops = u64;

/// Signed trust-line balance, expressed in drops of the issued currency.
/// Signed because a holder's balance can run negative relative to the
/// issuer under rippling (the issuer owes the holder, not the other way).
pub type IouDrops = i128;

/// Unix timestamp, UTC, seconds.
pub type Timestamp = i64;

/// Per-account transaction counter. Strictly increasing by one per applied
/// transaction from that account; used for replay protection and ordering.
pub type Sequence = u32;

/// Ledger (block) sequence number.
pub type LedgerSeq = u32;

// ── AccountId ────────────────────────────────────────────────────────────────

/// 160-bit account identifier: RIPEMD160(SHA256(public_key)).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Base58Check encoding with the given address version byte.
    pub fn to_base58check(&self, version: u8) -> String {
        bs58::encode(self.0).with_check_version(version).into_string()
    }

    pub fn from_base58check(s: &str, version: u8) -> Result<Self, NxfError> {
        let decoded = bs58::decode(s)
            .with_check(Some(version))
            .into_vec()
            .map_err(|e| NxfError::InvalidAddress(e.to_string()))?;
        let bytes: [u8; 20] = decoded
            .try_into()
            .map_err(|_| NxfError::InvalidAddress("unexpected payload length".into()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58check(crate::constants::ADDRESS_VERSION_BYTE))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

// ── TxId ─────────────────────────────────────────────────────────────────────

/// Transaction identifier, derived from the signed transaction per
/// `nxf_core::transaction::tx_id_from_signed`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, NxfError> {
        let bytes = hex::decode(s).map_err(|e| NxfError::InvalidTxId(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| NxfError::InvalidTxId("unexpected length".into()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({}…)", &self.to_hex()[..16])
    }
}

// ── CurrencyCode ─────────────────────────────────────────────────────────────

/// A 1-to-20 byte currency code. Codes of three ASCII-graphic bytes or
/// fewer render literally (`USD`); longer codes render as uppercase hex,
/// matching the convention used by real federated IOU ledgers.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyCode(Vec<u8>);

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self, NxfError> {
        let bytes = code.as_bytes();
        if bytes.is_empty() || bytes.len() > 20 {
            return Err(NxfError::InvalidCurrencyCode(code.to_string()));
        }
        if bytes.eq_ignore_ascii_case(b"NXF") {
            return Err(NxfError::InvalidCurrencyCode(
                "currency code shadows the native asset".into(),
            ));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() <= 3 && self.0.iter().all(|b| b.is_ascii_graphic()) {
            write!(f, "{}", String::from_utf8_lossy(&self.0))
        } else {
            write!(f, "{}", hex::encode_upper(&self.0))
        }
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self)
    }
}

// ── Amount ───────────────────────────────────────────────────────────────────

/// A value tagged with its asset: the native token, or an IOU issued by a
/// specific gateway account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum Amount {
    Native(Drops),
    Iou {
        drops: IouDrops,
        currency: CurrencyCode,
        issuer: AccountId,
    },
}

impl Amount {
    pub fn is_native(&self) -> bool {
        matches!(self, Amount::Native(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Amount::Native(d) => *d == 0,
            Amount::Iou { drops, .. } => *drops == 0,
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Amount::Iou { drops, .. } if *drops < 0)
    }
}

// ── Key material ─────────────────────────────────────────────────────────────

/// A compressed secp256k1 public key (33 bytes).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}b)", self.0.len())
    }
}

/// A DER-encoded ECDSA signature over secp256k1.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}b)", self.0.len())
    }
}
