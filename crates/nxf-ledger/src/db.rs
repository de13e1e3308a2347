use std::path::Path;

use nxf_core::account::Account;
use nxf_core::ledger_header::LedgerHeader;
use nxf_core::stake::StakeRecord;
use nxf_core::transaction::{Transaction, TxResult};
use nxf_core::types::{Drops, LedgerSeq, TxId};
use nxf_core::NxfError;
use serde::{Deserialize, Serialize};

/// A transaction as recorded in ledger history: the signed transaction
/// itself, the result code it produced, and the ledger it closed in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub tx: Transaction,
    pub result: TxResult,
    pub ledger_seq: LedgerSeq,
}

fn storage_err(e: impl std::fmt::Display) -> NxfError {
    NxfError::Storage(e.to_string())
}

fn serialize_err(e: impl std::fmt::Display) -> NxfError {
    NxfError::Serialization(e.to_string())
}

/// Compound key `sequence BE ∥ insertion-order BE` so sled's natural key
/// ordering reproduces replay order `(ledger_seq, rowid)`.
fn tx_compound_key(ledger_seq: LedgerSeq, insertion: u32) -> [u8; 8] {
    let mut key = [0u8; 8];
    key[..4].copy_from_slice(&ledger_seq.to_be_bytes());
    key[4..].copy_from_slice(&insertion.to_be_bytes());
    key
}

/// Persistent ledger state, backed by sled: one named tree per table,
/// mirroring the teacher's `StateDb` one-tree-per-table convention.
///
/// Trust lines are not broken out into their own tree — `Account` already
/// carries `trust_lines` inline as a `BTreeMap`, so persisting an account
/// persists its lines in the same write.
pub struct LedgerDb {
    inner: sled::Db,
    accounts: sled::Tree,
    closed_ledgers: sled::Tree,
    transactions: sled::Tree,
    tx_index: sled::Tree,
    stakes: sled::Tree,
    applied_tx_ids: sled::Tree,
    meta: sled::Tree,
}

const META_SCHEMA_VERSION: &str = "schema_version";
const META_CURRENT_SEQUENCE: &str = "current_sequence";
const META_TOTAL_SUPPLY: &str = "total_supply";
const META_TOTAL_BURNED: &str = "total_burned";
const META_TOTAL_MINTED: &str = "total_minted";
const META_FEE_POOL: &str = "fee_pool";
const META_NEXT_INSERTION: &str = "next_insertion_order";

const SCHEMA_VERSION: u32 = 1;

impl LedgerDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, NxfError> {
        let inner = sled::open(path).map_err(storage_err)?;
        let accounts = inner.open_tree("accounts").map_err(storage_err)?;
        let closed_ledgers = inner.open_tree("closed_ledgers").map_err(storage_err)?;
        let transactions = inner.open_tree("transactions").map_err(storage_err)?;
        let tx_index = inner.open_tree("tx_index").map_err(storage_err)?;
        let stakes = inner.open_tree("stakes").map_err(storage_err)?;
        let applied_tx_ids = inner.open_tree("applied_tx_ids").map_err(storage_err)?;
        let meta = inner.open_tree("meta").map_err(storage_err)?;

        let db = Self { inner, accounts, closed_ledgers, transactions, tx_index, stakes, applied_tx_ids, meta };
        if db.get_meta_u64(META_SCHEMA_VERSION)?.is_none() {
            db.put_meta_u64(META_SCHEMA_VERSION, SCHEMA_VERSION as u64)?;
        }
        Ok(db)
    }

    /// An ephemeral, empty database useful for tests and dry-run replay.
    pub fn open_temporary() -> Result<Self, NxfError> {
        let inner = sled::Config::new().temporary(true).open().map_err(storage_err)?;
        let accounts = inner.open_tree("accounts").map_err(storage_err)?;
        let closed_ledgers = inner.open_tree("closed_ledgers").map_err(storage_err)?;
        let transactions = inner.open_tree("transactions").map_err(storage_err)?;
        let tx_index = inner.open_tree("tx_index").map_err(storage_err)?;
        let stakes = inner.open_tree("stakes").map_err(storage_err)?;
        let applied_tx_ids = inner.open_tree("applied_tx_ids").map_err(storage_err)?;
        let meta = inner.open_tree("meta").map_err(storage_err)?;
        Ok(Self { inner, accounts, closed_ledgers, transactions, tx_index, stakes, applied_tx_ids, meta })
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    pub fn get_account(&self, id: &nxf_core::types::AccountId) -> Result<Option<Account>, NxfError> {
        match self.accounts.get(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serialize_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_account(&self, account: &Account) -> Result<(), NxfError> {
        let bytes = bincode::serialize(account).map_err(serialize_err)?;
        self.accounts.insert(account.account_id.as_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_account(&self, id: &nxf_core::types::AccountId) -> Result<(), NxfError> {
        self.accounts.remove(id.as_bytes()).map_err(storage_err)?;
        Ok(())
    }

    /// All accounts, ordered by address — the order `close_ledger` hashes
    /// state in.
    pub fn iter_accounts_by_address(&self) -> Result<Vec<Account>, NxfError> {
        let mut out = Vec::new();
        for item in self.accounts.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(serialize_err)?);
        }
        Ok(out)
    }

    pub fn account_count(&self) -> u64 {
        self.accounts.len() as u64
    }

    // ── Replay defense ───────────────────────────────────────────────────────

    pub fn is_applied(&self, tx_id: &TxId) -> bool {
        self.applied_tx_ids.contains_key(tx_id.as_bytes()).unwrap_or(false)
    }

    pub fn mark_applied(&self, tx_id: &TxId) -> Result<(), NxfError> {
        self.applied_tx_ids.insert(tx_id.as_bytes(), b"".as_ref()).map_err(storage_err)?;
        Ok(())
    }

    // ── Stakes ───────────────────────────────────────────────────────────────

    pub fn get_stake(&self, stake_id: &TxId) -> Result<Option<StakeRecord>, NxfError> {
        match self.stakes.get(stake_id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serialize_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_stake(&self, record: &StakeRecord) -> Result<(), NxfError> {
        let bytes = bincode::serialize(record).map_err(serialize_err)?;
        self.stakes.insert(record.stake_id.as_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    /// All stakes still earning interest (neither matured nor cancelled).
    pub fn iter_active_stakes(&self) -> Result<Vec<StakeRecord>, NxfError> {
        let mut out = Vec::new();
        for item in self.stakes.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            let record: StakeRecord = bincode::deserialize(&bytes).map_err(serialize_err)?;
            if record.is_active() {
                out.push(record);
            }
        }
        Ok(out)
    }

    pub fn iter_stakes_for_owner(&self, owner: &nxf_core::types::AccountId) -> Result<Vec<StakeRecord>, NxfError> {
        let mut out = Vec::new();
        for item in self.stakes.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            let record: StakeRecord = bincode::deserialize(&bytes).map_err(serialize_err)?;
            if record.owner == *owner {
                out.push(record);
            }
        }
        Ok(out)
    }

    // ── Transaction history ──────────────────────────────────────────────────

    pub fn store_transaction(&self, ledger_seq: LedgerSeq, tx: &Transaction, result: TxResult) -> Result<(), NxfError> {
        let insertion = self.next_insertion_order()?;
        let key = tx_compound_key(ledger_seq, insertion);
        let stored = StoredTransaction { tx: tx.clone(), result, ledger_seq };
        let bytes = bincode::serialize(&stored).map_err(serialize_err)?;
        self.transactions.insert(key, bytes).map_err(storage_err)?;
        self.tx_index.insert(tx.tx_id.as_bytes(), key.as_ref()).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_transaction(&self, tx_id: &TxId) -> Result<Option<StoredTransaction>, NxfError> {
        let Some(key) = self.tx_index.get(tx_id.as_bytes()).map_err(storage_err)? else {
            return Ok(None);
        };
        match self.transactions.get(&key).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serialize_err)?)),
            None => Ok(None),
        }
    }

    /// Entire transaction history in canonical replay order
    /// `(ledger_seq, insertion)`, as sled's key ordering already guarantees.
    pub fn iter_transactions_in_replay_order(&self) -> Result<Vec<StoredTransaction>, NxfError> {
        let mut out = Vec::new();
        for item in self.transactions.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(serialize_err)?);
        }
        Ok(out)
    }

    fn next_insertion_order(&self) -> Result<u32, NxfError> {
        let current = self.get_meta_u64(META_NEXT_INSERTION)?.unwrap_or(0) as u32;
        self.put_meta_u64(META_NEXT_INSERTION, (current + 1) as u64)?;
        Ok(current)
    }

    // ── Closed ledgers ───────────────────────────────────────────────────────

    pub fn put_ledger_header(&self, header: &LedgerHeader) -> Result<(), NxfError> {
        let bytes = bincode::serialize(header).map_err(serialize_err)?;
        self.closed_ledgers.insert(header.sequence.to_be_bytes(), bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn get_ledger_header(&self, sequence: LedgerSeq) -> Result<Option<LedgerHeader>, NxfError> {
        match self.closed_ledgers.get(sequence.to_be_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serialize_err)?)),
            None => Ok(None),
        }
    }

    pub fn latest_ledger_header(&self) -> Result<Option<LedgerHeader>, NxfError> {
        match self.closed_ledgers.last().map_err(storage_err)? {
            Some((_, bytes)) => Ok(Some(bincode::deserialize(&bytes).map_err(serialize_err)?)),
            None => Ok(None),
        }
    }

    // ── Meta counters ────────────────────────────────────────────────────────

    pub fn current_sequence(&self) -> Result<LedgerSeq, NxfError> {
        Ok(self.get_meta_u64(META_CURRENT_SEQUENCE)?.unwrap_or(0) as LedgerSeq)
    }

    pub fn set_current_sequence(&self, seq: LedgerSeq) -> Result<(), NxfError> {
        self.put_meta_u64(META_CURRENT_SEQUENCE, seq as u64)
    }

    pub fn total_supply(&self) -> Result<u128, NxfError> {
        self.get_meta_u128(META_TOTAL_SUPPLY)
    }

    pub fn set_total_supply(&self, v: u128) -> Result<(), NxfError> {
        self.put_meta_u128(META_TOTAL_SUPPLY, v)
    }

    pub fn total_burned(&self) -> Result<u128, NxfError> {
        self.get_meta_u128(META_TOTAL_BURNED)
    }

    pub fn set_total_burned(&self, v: u128) -> Result<(), NxfError> {
        self.put_meta_u128(META_TOTAL_BURNED, v)
    }

    pub fn total_minted(&self) -> Result<u128, NxfError> {
        self.get_meta_u128(META_TOTAL_MINTED)
    }

    pub fn set_total_minted(&self, v: u128) -> Result<(), NxfError> {
        self.put_meta_u128(META_TOTAL_MINTED, v)
    }

    pub fn fee_pool(&self) -> Result<Drops, NxfError> {
        Ok(self.get_meta_u64(META_FEE_POOL)?.unwrap_or(0))
    }

    pub fn set_fee_pool(&self, v: Drops) -> Result<(), NxfError> {
        self.put_meta_u64(META_FEE_POOL, v)
    }

    fn get_meta_u64(&self, key: &str) -> Result<Option<u64>, NxfError> {
        match self.meta.get(key.as_bytes()).map_err(storage_err)? {
            Some(bytes) => {
                let arr: [u8; 8] =
                    bytes.as_ref().try_into().map_err(|_| NxfError::Storage(format!("meta key {key} malformed")))?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn put_meta_u64(&self, key: &str, value: u64) -> Result<(), NxfError> {
        self.meta.insert(key.as_bytes(), &value.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    fn get_meta_u128(&self, key: &str) -> Result<u128, NxfError> {
        match self.meta.get(key.as_bytes()).map_err(storage_err)? {
            Some(bytes) => {
                let arr: [u8; 16] =
                    bytes.as_ref().try_into().map_err(|_| NxfError::Storage(format!("meta key {key} malformed")))?;
                Ok(u128::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn put_meta_u128(&self, key: &str, value: u128) -> Result<(), NxfError> {
        self.meta.insert(key.as_bytes(), &value.to_be_bytes()).map_err(storage_err)?;
        Ok(())
    }

    /// Flush all pending writes to disk. Called only at ledger-close
    /// boundaries, not after every transaction.
    pub fn flush(&self) -> Result<(), NxfError> {
        self.inner.flush().map_err(storage_err)?;
        Ok(())
    }
}
