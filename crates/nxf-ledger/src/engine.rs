use std::sync::Arc;

use nxf_core::account::{Account, AccountFlags, CurrencyCodeKey, TrustLine, TrustLineKey};
use nxf_core::constants::{ACCOUNT_RESERVE_DROPS, MIN_STAKE_AMOUNT_DROPS, OWNER_RESERVE_DROPS};
use nxf_core::ledger_header::LedgerHeader;
use nxf_core::stake::StakeRecord;
use nxf_core::transaction::{StakeTier, Transaction, TxKind, TxResult};
use nxf_core::types::{AccountId, Amount, CurrencyCode, Drops, LedgerSeq, Timestamp, TxId};
use nxf_core::NxfError;
use nxf_crypto::hash::blake2b_256;
use nxf_staking::{cancel_payout, effective_apy, maturity_payout, projected_payout};
use nxf_validator::LedgerView;
use tracing::info;

use crate::db::LedgerDb;

/// The ledger state transition engine: `apply_transaction` is the sole
/// mutator, and `close_ledger` drives the five-step closure algorithm over
/// a consensus-agreed batch.
pub struct LedgerEngine {
    db: Arc<LedgerDb>,
}

impl LedgerEngine {
    pub fn new(db: Arc<LedgerDb>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<LedgerDb> {
        &self.db
    }

    pub fn current_sequence(&self) -> Result<LedgerSeq, NxfError> {
        self.db.current_sequence()
    }

    /// Network-wide staked fraction of total supply, used by the dynamic
    /// APY formula. Recomputed from live state rather than tracked
    /// incrementally, since stakes mature and cancel continuously.
    pub fn stake_ratio(&self) -> Result<f64, NxfError> {
        let total_supply = self.db.total_supply()?.max(1) as f64;
        let staked: u128 = self.db.iter_active_stakes()?.iter().map(|s| s.principal as u128).sum();
        Ok((staked as f64 / total_supply).min(1.0))
    }

    // ── apply_transaction ────────────────────────────────────────────────────

    /// Validate and apply a single transaction. All-or-nothing: every check
    /// below runs before any `put_account` call for this transaction, so a
    /// rejected transaction leaves no trace in storage.
    pub fn apply_transaction(&self, tx: &Transaction, now: Timestamp) -> Result<TxResult, NxfError> {
        if self.db.is_applied(&tx.tx_id) {
            return Ok(TxResult::TecDuplicate);
        }

        let Some(mut signer) = self.db.get_account(&tx.account)? else {
            return Ok(TxResult::TecUnfunded);
        };

        if tx.sequence < signer.sequence {
            return Ok(TxResult::TefPastSeq);
        }
        if tx.sequence > signer.sequence {
            return Ok(TxResult::TefBadSeq);
        }

        let result = self.apply_kind(tx, &mut signer, now)?;
        if !result.is_success() {
            return Ok(result);
        }

        signer.sequence += 1;
        self.db.put_account(&signer)?;
        self.db.mark_applied(&tx.tx_id)?;

        info!(tx_id = %tx.tx_id, account = %tx.account, "applied transaction");
        Ok(TxResult::TesSuccess)
    }

    fn apply_kind(&self, tx: &Transaction, signer: &mut Account, now: Timestamp) -> Result<TxResult, NxfError> {
        match &tx.kind {
            TxKind::Payment { destination, amount, send_max: _, destination_tag, partial_payment_ok } => {
                self.apply_payment(tx, signer, *destination, amount, *destination_tag, *partial_payment_ok)
            }
            TxKind::TrustSet(fields) => self.apply_trust_set(tx, signer, fields),
            TxKind::AccountSet(fields) => self.apply_account_set(tx, signer, fields),
            TxKind::SetRegularKey { regular_key } => {
                if signer.balance < tx.fee {
                    return Ok(TxResult::TecUnfunded);
                }
                self.charge_fee(signer, tx.fee)?;
                signer.regular_key = regular_key.clone();
                Ok(TxResult::TesSuccess)
            }
            TxKind::SignerListSet { quorum, signers } => {
                if signer.balance < tx.fee {
                    return Ok(TxResult::TecUnfunded);
                }
                self.charge_fee(signer, tx.fee)?;
                if signer.signer_list.is_none() {
                    signer.owner_count += 1;
                }
                signer.signer_list =
                    Some(nxf_core::account::SignerList { quorum: *quorum, signers: signers.clone() });
                Ok(TxResult::TesSuccess)
            }
            TxKind::TicketCreate { count } => {
                if signer.balance < tx.fee {
                    return Ok(TxResult::TecUnfunded);
                }
                let required_reserve =
                    ACCOUNT_RESERVE_DROPS + (signer.owner_count + count) as Drops * OWNER_RESERVE_DROPS;
                if signer.balance.saturating_sub(tx.fee) < required_reserve {
                    return Ok(TxResult::TecInsufReserve);
                }
                self.charge_fee(signer, tx.fee)?;
                signer.owner_count += count;
                Ok(TxResult::TesSuccess)
            }
            TxKind::AccountDelete { destination } => self.apply_account_delete(tx, signer, *destination),
            TxKind::Stake { tier, amount } => self.apply_stake(tx, signer, *tier, *amount, now),
            TxKind::Unstake { stake_id } => self.apply_unstake(tx, signer, *stake_id, now),
            // The DEX order-book subsystem is out of scope: these are
            // parsed and validated for canonical form but never executed.
            // No aggregate or balance mutation happens on this path — only
            // `apply_transaction`'s success branch persists `signer` and
            // burns the fee, so touching db aggregates here ahead of that
            // would burn a fee that is never actually debited.
            TxKind::OfferCreate { .. } | TxKind::OfferCancel { .. } => Ok(TxResult::TecNoDst),
        }
    }

    /// Debit `fee` from `signer.balance` and burn it from circulating supply.
    fn charge_fee(&self, signer: &mut Account, fee: Drops) -> Result<(), NxfError> {
        signer.balance -= fee;
        self.burn_fee(fee)
    }

    /// Record a fee already debited by the caller (native payments subtract
    /// `amount + fee` from the balance in one step).
    fn burn_fee(&self, fee: Drops) -> Result<(), NxfError> {
        let fee_pool = self.db.fee_pool()?.saturating_add(fee);
        self.db.set_fee_pool(fee_pool)?;
        let total_burned = self.db.total_burned()?.saturating_add(fee as u128);
        self.db.set_total_burned(total_burned)?;
        let total_supply = self.db.total_supply()?.saturating_sub(fee as u128);
        self.db.set_total_supply(total_supply)?;
        Ok(())
    }

    // ── Payment ──────────────────────────────────────────────────────────────

    fn apply_payment(
        &self,
        tx: &Transaction,
        signer: &mut Account,
        destination: AccountId,
        amount: &Amount,
        destination_tag: Option<u32>,
        partial_payment_ok: bool,
    ) -> Result<TxResult, NxfError> {
        let mut dest_account = self.db.get_account(&destination)?;

        if let Some(dest) = &dest_account {
            if dest.flags.has(AccountFlags::REQUIRE_DEST_TAG) && destination_tag.unwrap_or(0) == 0 {
                return Ok(TxResult::TecDstTagNeeded);
            }
            if dest.flags.has(AccountFlags::DEPOSIT_AUTH) && !dest.deposit_preauth.contains(&tx.account) {
                return Ok(TxResult::TecRequireAuth);
            }
        }

        match amount {
            Amount::Native(drops) => {
                let total = drops.saturating_add(tx.fee);
                if signer.balance < total {
                    return Ok(TxResult::TecUnfunded);
                }
                signer.balance -= total;
                self.burn_fee(tx.fee)?;

                let mut dest = dest_account.take().unwrap_or_else(|| {
                    // Auto-created on first incoming native payment, keyed
                    // under the sender's master key as a placeholder; a real
                    // owner establishes their own key via a later
                    // `SetRegularKey` once they take control of the address.
                    Account::new(destination, signer.master_key.clone(), 0)
                });
                dest.balance += drops;
                self.db.put_account(&dest)?;
                Ok(TxResult::TesSuccess)
            }
            Amount::Iou { drops: requested, currency, issuer } => {
                if signer.balance < tx.fee {
                    return Ok(TxResult::TecUnfunded);
                }

                let Some(dest) = dest_account.as_mut() else {
                    return Ok(TxResult::TecNoDst);
                };

                let issuer_account = if *issuer == tx.account {
                    signer.clone()
                } else if destination == *issuer {
                    dest.clone()
                } else {
                    match self.db.get_account(issuer)? {
                        Some(acc) => acc,
                        None => return Ok(TxResult::TecNoDst),
                    }
                };
                if issuer_account.flags.has(AccountFlags::GLOBAL_FREEZE) && destination != *issuer {
                    return Ok(TxResult::TecGlobalFreeze);
                }

                let sender_is_issuer = tx.account == *issuer;
                let dest_is_issuer = destination == *issuer;

                let source_line = if sender_is_issuer { None } else { signer.trust_line(currency, issuer).cloned() };
                if !sender_is_issuer && source_line.is_none() {
                    return Ok(TxResult::TecNoLine);
                }
                if let Some(line) = &source_line {
                    if line.frozen {
                        return Ok(TxResult::TecFrozen);
                    }
                }

                let dest_line = if dest_is_issuer { None } else { dest.trust_line(currency, issuer).cloned() };
                if !dest_is_issuer && dest_line.is_none() {
                    return Ok(TxResult::TecNoLine);
                }
                if let Some(line) = &dest_line {
                    if line.frozen {
                        return Ok(TxResult::TecFrozen);
                    }
                }

                let rate = issuer_account.transfer_rate as i128;
                let gross = *requested;
                let scale = nxf_core::constants::TRANSFER_RATE_SCALE as i128;
                let debit = gross.saturating_mul(rate) / scale;

                let available = if sender_is_issuer { i128::MAX } else { source_line.as_ref().unwrap().balance.max(0) };

                let (delivered, actual_debit) = if debit <= available {
                    (gross, debit)
                } else if partial_payment_ok && available > 0 {
                    let delivered = available.saturating_mul(scale) / rate;
                    (delivered, available)
                } else {
                    return Ok(TxResult::TecUnfunded);
                };
                if delivered <= 0 {
                    return Ok(TxResult::TecUnfunded);
                }

                if !sender_is_issuer {
                    let line = signer.trust_line_mut(currency, issuer).expect("checked above");
                    line.balance -= actual_debit;
                }
                if !dest_is_issuer {
                    let line = dest.trust_line_mut(currency, issuer).expect("checked above");
                    if line.balance.saturating_add(delivered) > line.limit {
                        return Ok(TxResult::TecUnfunded);
                    }
                    line.balance += delivered;
                }

                signer.balance -= tx.fee;
                self.burn_fee(tx.fee)?;
                self.db.put_account(dest)?;
                if !partial_payment_ok && delivered < gross {
                    return Ok(TxResult::TecPartialPayment);
                }
                Ok(TxResult::TesSuccess)
            }
        }
    }

    // ── TrustSet ─────────────────────────────────────────────────────────────

    fn apply_trust_set(
        &self,
        tx: &Transaction,
        signer: &mut Account,
        fields: &nxf_core::transaction::TrustSetFields,
    ) -> Result<TxResult, NxfError> {
        if signer.balance < tx.fee {
            return Ok(TxResult::TecUnfunded);
        }

        let key = TrustLineKey { currency: CurrencyCodeKey::from(&fields.currency), issuer: fields.issuer };
        let is_new = !signer.trust_lines.contains_key(&key);

        if is_new {
            let required_reserve = ACCOUNT_RESERVE_DROPS + (signer.owner_count + 1) as Drops * OWNER_RESERVE_DROPS;
            if signer.balance.saturating_sub(tx.fee) < required_reserve {
                return Ok(TxResult::TecInsufReserve);
            }
        }

        self.charge_fee(signer, tx.fee)?;

        let line = signer.trust_lines.entry(key).or_insert_with(|| TrustLine::new(fields.limit));
        line.limit = fields.limit;
        if let Some(q) = fields.quality_in {
            line.quality_in = q;
        }
        if let Some(q) = fields.quality_out {
            line.quality_out = q;
        }
        if fields.set_auth {
            line.authorized = true;
        }
        if fields.set_no_ripple {
            line.no_ripple = true;
        }
        if fields.clear_no_ripple {
            line.no_ripple = false;
        }
        if fields.set_freeze {
            line.frozen = true;
        }
        if fields.clear_freeze {
            line.frozen = false;
        }

        if is_new {
            signer.owner_count += 1;
        }
        Ok(TxResult::TesSuccess)
    }

    // ── AccountSet ───────────────────────────────────────────────────────────

    fn apply_account_set(
        &self,
        tx: &Transaction,
        signer: &mut Account,
        fields: &nxf_core::transaction::AccountSetFields,
    ) -> Result<TxResult, NxfError> {
        if signer.balance < tx.fee {
            return Ok(TxResult::TecUnfunded);
        }
        self.charge_fee(signer, tx.fee)?;

        signer.flags.0 &= !fields.clear_flags;
        signer.flags.0 |= fields.set_flags;
        if let Some(rate) = fields.transfer_rate {
            signer.transfer_rate = rate;
        }
        if let Some(acct) = fields.deposit_preauth_add {
            if !signer.deposit_preauth.contains(&acct) {
                signer.deposit_preauth.push(acct);
            }
        }
        if let Some(acct) = fields.deposit_preauth_remove {
            signer.deposit_preauth.retain(|a| *a != acct);
        }
        Ok(TxResult::TesSuccess)
    }

    // ── AccountDelete ────────────────────────────────────────────────────────

    fn apply_account_delete(
        &self,
        tx: &Transaction,
        signer: &mut Account,
        destination: AccountId,
    ) -> Result<TxResult, NxfError> {
        if signer.balance < tx.fee {
            return Ok(TxResult::TecUnfunded);
        }
        if signer.owner_count > 0 || !signer.trust_lines.is_empty() {
            return Ok(TxResult::TecHasObligations);
        }
        let Some(mut dest) = self.db.get_account(&destination)? else {
            return Ok(TxResult::TecNoDst);
        };

        let refund = signer.balance.saturating_sub(tx.fee);
        self.burn_fee(tx.fee)?;
        dest.balance = dest.balance.saturating_add(refund);
        self.db.put_account(&dest)?;
        self.db.delete_account(&signer.account_id)?;

        // `apply_transaction` writes `signer` back unconditionally after a
        // success; zero it out so that final write is harmless.
        signer.balance = 0;
        Ok(TxResult::TesSuccess)
    }

    // ── Stake / Unstake ──────────────────────────────────────────────────────

    fn apply_stake(
        &self,
        tx: &Transaction,
        signer: &mut Account,
        tier: StakeTier,
        amount: Drops,
        now: Timestamp,
    ) -> Result<TxResult, NxfError> {
        if amount < MIN_STAKE_AMOUNT_DROPS {
            return Ok(TxResult::TemMalformed);
        }
        let total = amount.saturating_add(tx.fee);
        if signer.balance < total {
            return Ok(TxResult::TecUnfunded);
        }
        signer.balance -= total;
        self.burn_fee(tx.fee)?;

        let ratio = self.stake_ratio()?;
        let apy = effective_apy(tier, ratio);
        let record = StakeRecord::new(tx.tx_id, signer.account_id, amount, tier, apy, now);
        self.db.put_stake(&record)?;
        Ok(TxResult::TesSuccess)
    }

    fn apply_unstake(
        &self,
        tx: &Transaction,
        signer: &mut Account,
        stake_id: TxId,
        now: Timestamp,
    ) -> Result<TxResult, NxfError> {
        if signer.balance < tx.fee {
            return Ok(TxResult::TecUnfunded);
        }
        let Some(mut record) = self.db.get_stake(&stake_id)? else {
            return Ok(TxResult::TecStakeLocked);
        };
        if record.owner != signer.account_id || !record.is_active() {
            return Ok(TxResult::TecStakeLocked);
        }

        self.charge_fee(signer, tx.fee)?;

        if !record.is_flexible() && now >= record.maturity_time {
            let (total, interest) = maturity_payout(&record);
            signer.balance = signer.balance.saturating_add(total);
            record.matured = true;
            record.payout = Some(total);
            let total_minted = self.db.total_minted()?.saturating_add(interest as u128);
            self.db.set_total_minted(total_minted)?;
            let total_supply = self.db.total_supply()?.saturating_add(interest as u128);
            self.db.set_total_supply(total_supply)?;
        } else {
            let outcome = cancel_payout(&record, now);
            signer.balance = signer.balance.saturating_add(outcome.payout);
            record.cancelled = true;
            record.payout = Some(outcome.payout);
            let burned = (outcome.principal_burned as u128).saturating_add(outcome.interest_forfeited as u128);
            let total_burned = self.db.total_burned()?.saturating_add(burned);
            self.db.set_total_burned(total_burned)?;
            let total_supply = self.db.total_supply()?.saturating_sub(outcome.interest_forfeited as u128);
            self.db.set_total_supply(total_supply)?;
        }
        self.db.put_stake(&record)?;
        Ok(TxResult::TesSuccess)
    }

    /// Read-only projection shared with the RPC surface: what an active
    /// stake would pay out if unstaked right now.
    pub fn projected_stake_payout(&self, stake_id: &TxId, now: Timestamp) -> Result<Option<Drops>, NxfError> {
        Ok(self.db.get_stake(stake_id)?.map(|record| projected_payout(&record, now)))
    }

    // ── Ledger closure ───────────────────────────────────────────────────────

    /// Apply a consensus-agreed batch in lexicographic-by-tx-id order, settle
    /// matured stakes, and emit the new `LedgerHeader`. Returns the header
    /// and the per-transaction results in application order.
    pub fn close_ledger(
        &self,
        mut txs: Vec<Transaction>,
        now: Timestamp,
    ) -> Result<(LedgerHeader, Vec<(TxId, TxResult)>), NxfError> {
        txs.sort_by_key(|t| t.tx_id);

        let next_seq = self.db.current_sequence()?.saturating_add(1);
        let mut results = Vec::with_capacity(txs.len());
        let mut tx_ids = Vec::with_capacity(txs.len());

        for tx in &txs {
            let result = self.apply_transaction(tx, now)?;
            self.db.store_transaction(next_seq, tx, result)?;
            tx_ids.push(tx.tx_id);
            results.push((tx.tx_id, result));
        }

        self.settle_matured_stakes(now)?;

        let tx_hash = hash_tx_ids(&tx_ids);
        let state_hash = self.hash_state()?;
        let parent_hash = self.db.latest_ledger_header()?.map(|h| h.hash).unwrap_or([0u8; 32]);
        let total_nxf_drops = self.db.total_supply()?.min(Drops::MAX as u128) as Drops;

        let mut header = LedgerHeader {
            sequence: next_seq,
            parent_hash,
            tx_hash,
            state_hash,
            close_time: now,
            tx_count: txs.len() as u32,
            total_nxf_drops,
            hash: [0u8; 32],
        };
        header.hash = blake2b_256(&header.signing_bytes());

        self.db.put_ledger_header(&header)?;
        self.db.set_current_sequence(next_seq)?;
        self.db.flush()?;

        info!(sequence = next_seq, tx_count = header.tx_count, "ledger closed");
        Ok((header, results))
    }

    fn settle_matured_stakes(&self, now: Timestamp) -> Result<(), NxfError> {
        for record in self.db.iter_active_stakes()? {
            if record.is_flexible() || now < record.maturity_time {
                continue;
            }
            let Some(mut owner) = self.db.get_account(&record.owner)? else { continue };
            let (total, interest) = maturity_payout(&record);
            owner.balance = owner.balance.saturating_add(total);
            self.db.put_account(&owner)?;

            let mut settled = record;
            settled.matured = true;
            settled.payout = Some(total);
            self.db.put_stake(&settled)?;

            let total_minted = self.db.total_minted()?.saturating_add(interest as u128);
            self.db.set_total_minted(total_minted)?;
            let total_supply = self.db.total_supply()?.saturating_add(interest as u128);
            self.db.set_total_supply(total_supply)?;
        }
        Ok(())
    }

    fn hash_state(&self) -> Result<[u8; 32], NxfError> {
        let mut accounts = self.db.iter_accounts_by_address()?;
        accounts.sort_by_key(|a| a.account_id);
        let mut buf = Vec::new();
        for account in &accounts {
            let bytes = bincode::serialize(account).map_err(|e| NxfError::Serialization(e.to_string()))?;
            buf.extend_from_slice(&bytes);
        }
        Ok(blake2b_256(&buf))
    }
}

fn hash_tx_ids(tx_ids: &[TxId]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(tx_ids.len() * 32);
    for id in tx_ids {
        buf.extend_from_slice(id.as_bytes());
    }
    blake2b_256(&buf)
}

impl LedgerView for LedgerEngine {
    fn account(&self, id: &AccountId) -> Option<Account> {
        self.db.get_account(id).ok().flatten()
    }

    fn trust_line(&self, holder: &AccountId, currency: &CurrencyCode, issuer: &AccountId) -> Option<TrustLine> {
        self.db.get_account(holder).ok().flatten()?.trust_line(currency, issuer).cloned()
    }

    fn is_applied(&self, tx_id: &TxId) -> bool {
        self.db.is_applied(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxf_core::constants::DROPS_PER_NXF;
    use nxf_core::types::Signature;
    use nxf_crypto::keypair::KeyPair;
    use nxf_crypto::signing::{sign_transaction, tx_id_from_signed};

    fn engine_with(balance: Drops) -> (LedgerEngine, KeyPair) {
        let db = Arc::new(LedgerDb::open_temporary().unwrap());
        db.set_total_supply(1_000_000 * DROPS_PER_NXF as u128).unwrap();
        let engine = LedgerEngine::new(db);
        let kp = KeyPair::generate();
        let acc = Account::new(kp.account_id, kp.public_key.clone(), balance);
        engine.db.put_account(&acc).unwrap();
        (engine, kp)
    }

    fn payment(kp: &KeyPair, sequence: u32, destination: AccountId, amount: Drops, fee: Drops) -> Transaction {
        let mut tx = Transaction {
            tx_id: TxId::from_bytes([0; 32]),
            account: kp.account_id,
            sequence,
            fee,
            memo: None,
            source_tag: None,
            signing_public_key: kp.public_key.clone(),
            signature: Signature(vec![]),
            kind: TxKind::Payment {
                destination,
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
    fn payment_debits_sender_and_auto_creates_destination() {
        let (engine, kp) = engine_with(1_000 * DROPS_PER_NXF);
        let dest = AccountId::from_bytes([7; 20]);
        let tx = payment(&kp, 1, dest, 10 * DROPS_PER_NXF, 1_000);
        let result = engine.apply_transaction(&tx, 1_000).unwrap();
        assert_eq!(result, TxResult::TesSuccess);

        let sender = engine.db.get_account(&kp.account_id).unwrap().unwrap();
        assert_eq!(sender.balance, 1_000 * DROPS_PER_NXF - 10 * DROPS_PER_NXF - 1_000);
        assert_eq!(sender.sequence, 2);

        let recipient = engine.db.get_account(&dest).unwrap().unwrap();
        assert_eq!(recipient.balance, 10 * DROPS_PER_NXF);
    }

    #[test]
    fn duplicate_transaction_is_rejected_on_replay() {
        let (engine, kp) = engine_with(1_000 * DROPS_PER_NXF);
        let dest = AccountId::from_bytes([7; 20]);
        let tx = payment(&kp, 1, dest, 10 * DROPS_PER_NXF, 1_000);
        assert_eq!(engine.apply_transaction(&tx, 1_000).unwrap(), TxResult::TesSuccess);
        assert_eq!(engine.apply_transaction(&tx, 1_000).unwrap(), TxResult::TecDuplicate);
    }

    #[test]
    fn insufficient_balance_rejected_without_mutation() {
        let (engine, kp) = engine_with(5 * DROPS_PER_NXF);
        let dest = AccountId::from_bytes([7; 20]);
        let tx = payment(&kp, 1, dest, 10 * DROPS_PER_NXF, 1_000);
        assert_eq!(engine.apply_transaction(&tx, 1_000).unwrap(), TxResult::TecUnfunded);
        let sender = engine.db.get_account(&kp.account_id).unwrap().unwrap();
        assert_eq!(sender.balance, 5 * DROPS_PER_NXF);
        assert_eq!(sender.sequence, 1);
    }

    #[test]
    fn close_ledger_advances_sequence_and_chains_hash() {
        let (engine, kp) = engine_with(1_000 * DROPS_PER_NXF);
        let dest = AccountId::from_bytes([7; 20]);
        let tx = payment(&kp, 1, dest, 10 * DROPS_PER_NXF, 1_000);
        let (header1, results1) = engine.close_ledger(vec![tx], 1_000).unwrap();
        assert_eq!(header1.sequence, 1);
        assert_eq!(results1.len(), 1);
        assert_eq!(results1[0].1, TxResult::TesSuccess);

        let tx2 = payment(&kp, 2, dest, 5 * DROPS_PER_NXF, 1_000);
        let (header2, _) = engine.close_ledger(vec![tx2], 2_000).unwrap();
        assert_eq!(header2.sequence, 2);
        assert_eq!(header2.parent_hash, header1.hash);
    }

    #[test]
    fn flexible_stake_unstake_round_trips_principal_plus_interest() {
        let (engine, kp) = engine_with(1_000 * DROPS_PER_NXF);
        let mut tx = Transaction {
            tx_id: TxId::from_bytes([0; 32]),
            account: kp.account_id,
            sequence: 1,
            fee: 1_000,
            memo: None,
            source_tag: None,
            signing_public_key: kp.public_key.clone(),
            signature: Signature(vec![]),
            kind: TxKind::Stake { tier: StakeTier::Flexible, amount: 100 * DROPS_PER_NXF },
        };
        tx.signature = sign_transaction(&kp, &tx);
        tx.tx_id = tx_id_from_signed(&tx);
        assert_eq!(engine.apply_transaction(&tx, 0).unwrap(), TxResult::TesSuccess);

        let stake_id = tx.tx_id;
        let mut unstake_tx = Transaction {
            tx_id: TxId::from_bytes([0; 32]),
            account: kp.account_id,
            sequence: 2,
            fee: 1_000,
            memo: None,
            source_tag: None,
            signing_public_key: kp.public_key.clone(),
            signature: Signature(vec![]),
            kind: TxKind::Unstake { stake_id },
        };
        unstake_tx.signature = sign_transaction(&kp, &unstake_tx);
        unstake_tx.tx_id = tx_id_from_signed(&unstake_tx);

        let before = engine.db.get_account(&kp.account_id).unwrap().unwrap().balance;
        assert_eq!(engine.apply_transaction(&unstake_tx, 86_400 * 30).unwrap(), TxResult::TesSuccess);
        let after = engine.db.get_account(&kp.account_id).unwrap().unwrap().balance;
        assert!(after > before, "flexible unstake with accrued interest must pay more than it held staked");

        let record = engine.db.get_stake(&stake_id).unwrap().unwrap();
        assert!(record.cancelled);
    }

    #[test]
    fn account_delete_refunds_balance_to_destination() {
        let (engine, kp) = engine_with(1_000 * DROPS_PER_NXF);
        let dest_kp = KeyPair::generate();
        let dest_acc = Account::new(dest_kp.account_id, dest_kp.public_key.clone(), ACCOUNT_RESERVE_DROPS);
        engine.db.put_account(&dest_acc).unwrap();

        let mut tx = Transaction {
            tx_id: TxId::from_bytes([0; 32]),
            account: kp.account_id,
            sequence: 1,
            fee: 1_000,
            memo: None,
            source_tag: None,
            signing_public_key: kp.public_key.clone(),
            signature: Signature(vec![]),
            kind: TxKind::AccountDelete { destination: dest_kp.account_id },
        };
        tx.signature = sign_transaction(&kp, &tx);
        tx.tx_id = tx_id_from_signed(&tx);

        assert_eq!(engine.apply_transaction(&tx, 0).unwrap(), TxResult::TesSuccess);
        assert!(engine.db.get_account(&kp.account_id).unwrap().is_none());
        let dest = engine.db.get_account(&dest_kp.account_id).unwrap().unwrap();
        assert_eq!(dest.balance, ACCOUNT_RESERVE_DROPS + 1_000 * DROPS_PER_NXF - 1_000);
    }
}
