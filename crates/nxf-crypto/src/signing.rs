use k256::ecdsa::signature::Verifier as _;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use nxf_core::transaction::Transaction;
use nxf_core::types::{PublicKey, Signature};
use nxf_core::NxfError;

use crate::hash::double_sha256;
use crate::keypair::KeyPair;

/// Verify `signature` over `message` (already double-SHA256-hashed) under
/// `public_key`. Returns `Ok(())` on success, `NxfError::InvalidSignature`
/// otherwise — including for malformed key or signature bytes, so callers
/// never need to distinguish "bad encoding" from "bad signature".
pub fn verify_transaction_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<(), NxfError> {
    let verifying_key =
        VerifyingKey::from_sec1_bytes(public_key.as_bytes()).map_err(|_| NxfError::InvalidSignature)?;
    let sig = EcdsaSignature::from_der(signature.as_bytes()).map_err(|_| NxfError::InvalidSignature)?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| NxfError::InvalidSignature)
}

/// Sign a transaction's canonical signing blob: `SHA256(SHA256(blob))` is
/// hashed once more per the double-hash convention and signed with `keypair`.
pub fn sign_transaction(keypair: &KeyPair, tx: &Transaction) -> Signature {
    let blob = tx.signing_blob();
    let digest = double_sha256(&blob);
    keypair.sign(&digest)
}

/// Recompute a transaction's canonical `tx_id` from its signed fields:
/// `SHA256(blob ∥ signature)`.
pub fn tx_id_from_signed(tx: &Transaction) -> nxf_core::types::TxId {
    let mut buf = tx.signing_blob();
    buf.extend_from_slice(tx.signature.as_bytes());
    nxf_core::types::TxId::from_bytes(crate::hash::sha256(&buf))
}

/// Recompute the signing hash (`SHA256(SHA256(blob))`) that a signer must
/// sign over, and verify the transaction's signature against it.
pub fn verify_transaction(tx: &Transaction) -> Result<(), NxfError> {
    let digest = double_sha256(&tx.signing_blob());
    verify_transaction_signature(&tx.signing_public_key, &digest, &tx.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxf_core::transaction::TxKind;
    use nxf_core::types::{AccountId, Amount};

    fn sample_tx(keypair: &KeyPair) -> Transaction {
        let mut tx = Transaction {
            tx_id: nxf_core::types::TxId::from_bytes([0u8; 32]),
            account: keypair.account_id,
            sequence: 1,
            fee: 1_000,
            memo: None,
            source_tag: None,
            signing_public_key: keypair.public_key.clone(),
            signature: Signature(vec![]),
            kind: TxKind::Payment {
                destination: AccountId::from_bytes([1u8; 20]),
                amount: Amount::Native(100),
                send_max: None,
                destination_tag: None,
                partial_payment_ok: false,
            },
        };
        tx.signature = sign_transaction(keypair, &tx);
        tx.tx_id = tx_id_from_signed(&tx);
        tx
    }

    #[test]
    fn valid_signature_verifies() {
        let kp = KeyPair::generate();
        let tx = sample_tx(&kp);
        assert!(verify_transaction(&tx).is_ok());
    }

    #[test]
    fn tampered_field_fails_verification() {
        let kp = KeyPair::generate();
        let mut tx = sample_tx(&kp);
        tx.fee += 1;
        assert!(verify_transaction(&tx).is_err());
    }

    #[test]
    fn single_bit_change_changes_tx_id() {
        let kp = KeyPair::generate();
        let tx = sample_tx(&kp);
        let mut tx2 = tx.clone();
        tx2.fee += 1;
        tx2.signature = sign_transaction(&kp, &tx2);
        let id2 = tx_id_from_signed(&tx2);
        assert_ne!(tx.tx_id, id2);
    }
}
