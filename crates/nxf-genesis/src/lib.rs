//! Founds a new NXF ledger.
//!
//! [`apply_genesis`] writes the founding account directly into storage,
//! bypassing [`nxf_ledger::LedgerEngine::apply_transaction`] entirely — it
//! is the one place in the protocol where [`GENESIS_TOTAL_SUPPLY_DROPS`]
//! drops are minted without a matching debit anywhere else.

pub mod params;

pub use params::GenesisParams;

use nxf_core::account::Account;
use nxf_core::constants::GENESIS_TOTAL_SUPPLY_DROPS;
use nxf_core::ledger_header::LedgerHeader;
use nxf_core::types::AccountId;
use nxf_core::NxfError;
use nxf_crypto::account_id_from_public_key;
use nxf_crypto::hash::blake2b_256;
use nxf_ledger::LedgerDb;
use tracing::info;

/// Founds the ledger described by `params` on `db`, which must be empty
/// (no ledger header at sequence 0 yet). Returns the founding account id.
pub fn apply_genesis(db: &LedgerDb, params: &GenesisParams) -> Result<AccountId, NxfError> {
    if db.latest_ledger_header()?.is_some() {
        return Err(NxfError::Inconsistent(
            "genesis cannot run against a non-empty ledger".into(),
        ));
    }

    let supply = u64::try_from(GENESIS_TOTAL_SUPPLY_DROPS)
        .map_err(|_| NxfError::Inconsistent("genesis supply overflows a drops amount".into()))?;

    let founder = account_id_from_public_key(&params.foundation_key);
    let account = Account::new(founder.clone(), params.foundation_key.clone(), supply);
    db.put_account(&account)?;

    db.set_total_supply(GENESIS_TOTAL_SUPPLY_DROPS)?;
    db.set_total_minted(GENESIS_TOTAL_SUPPLY_DROPS)?;
    db.set_total_burned(0)?;
    db.set_fee_pool(0)?;
    db.set_current_sequence(0)?;

    let header = genesis_header(params, supply);
    db.put_ledger_header(&header)?;
    db.flush()?;

    info!(account = %founder, drops = supply, "applied genesis");
    Ok(founder)
}

fn genesis_header(params: &GenesisParams, supply: u64) -> LedgerHeader {
    let mut header = LedgerHeader {
        sequence: 0,
        parent_hash: [0u8; 32],
        tx_hash: [0u8; 32],
        state_hash: [0u8; 32],
        close_time: params.close_time,
        tx_count: 0,
        total_nxf_drops: supply,
        hash: [0u8; 32],
    };
    header.hash = blake2b_256(&header.signing_bytes());
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxf_crypto::KeyPair;

    fn db() -> LedgerDb {
        LedgerDb::open_temporary().expect("open temp db")
    }

    #[test]
    fn genesis_mints_exact_total_supply() {
        let db = db();
        let keypair = KeyPair::generate();
        let params = GenesisParams::new(keypair.public_key.clone());

        let founder = apply_genesis(&db, &params).expect("genesis applies");

        let account = db.get_account(&founder).expect("read account").expect("account exists");
        assert_eq!(account.balance as u128, GENESIS_TOTAL_SUPPLY_DROPS);
        assert_eq!(db.total_supply().unwrap(), GENESIS_TOTAL_SUPPLY_DROPS);
        assert_eq!(db.total_minted().unwrap(), GENESIS_TOTAL_SUPPLY_DROPS);
        assert_eq!(db.total_burned().unwrap(), 0);
        assert_eq!(db.current_sequence().unwrap(), 0);
    }

    #[test]
    fn genesis_header_chains_from_zero_parent() {
        let db = db();
        let keypair = KeyPair::generate();
        let params = GenesisParams::new(keypair.public_key.clone());
        apply_genesis(&db, &params).unwrap();

        let header = db.latest_ledger_header().unwrap().expect("header written");
        assert_eq!(header.sequence, 0);
        assert_eq!(header.parent_hash, [0u8; 32]);
        assert_eq!(header.total_nxf_drops as u128, GENESIS_TOTAL_SUPPLY_DROPS);
    }

    #[test]
    fn genesis_refuses_to_run_twice() {
        let db = db();
        let keypair = KeyPair::generate();
        let params = GenesisParams::new(keypair.public_key.clone());
        apply_genesis(&db, &params).unwrap();

        let err = apply_genesis(&db, &params).unwrap_err();
        assert!(matches!(err, NxfError::Inconsistent(_)));
    }
}
