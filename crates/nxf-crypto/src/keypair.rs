use k256::ecdsa::signature::Signer as _;
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use nxf_core::types::{AccountId, PublicKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::address::account_id_from_public_key;

/// A node or wallet keypair: secp256k1 signing key plus the derived account.
///
/// The secret scalar is held in a `Zeroizing<Vec<u8>>` so it is wiped from
/// memory on drop rather than lingering in a freed heap allocation.
#[derive(Serialize, Deserialize)]
pub struct KeyPair {
    pub account_id: AccountId,
    pub public_key: PublicKey,
    secret_key: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Generate a fresh secp256k1 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Sign `message` (already hashed per the caller's convention) and
    /// return a DER-encoded ECDSA signature.
    pub fn sign(&self, message: &[u8]) -> nxf_core::types::Signature {
        let signing_key = SigningKey::from_slice(&self.secret_key)
            .expect("stored secret key is a valid secp256k1 scalar");
        let sig: EcdsaSignature = signing_key.sign(message);
        nxf_core::types::Signature(sig.to_der().as_bytes().to_vec())
    }

    /// Raw secret scalar bytes (32 bytes), for wallet file persistence.
    pub fn secret_key_bytes(&self) -> &[u8] {
        &self.secret_key
    }

    /// Restore a `KeyPair` from a raw 32-byte secp256k1 secret scalar.
    pub fn from_raw(secret_key_bytes: &[u8]) -> Result<Self, nxf_core::NxfError> {
        let signing_key = SigningKey::from_slice(secret_key_bytes)
            .map_err(|e| nxf_core::NxfError::InvalidKey(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let public_key = PublicKey(verifying_key.to_encoded_point(true).as_bytes().to_vec());
        let account_id = account_id_from_public_key(&public_key);
        Self {
            account_id,
            public_key,
            secret_key: Zeroizing::new(signing_key.to_bytes().to_vec()),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ account_id: {:?} }}", self.account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_from_raw() {
        let kp = KeyPair::generate();
        let restored = KeyPair::from_raw(kp.secret_key_bytes()).unwrap();
        assert_eq!(kp.account_id, restored.account_id);
        assert_eq!(kp.public_key.as_bytes(), restored.public_key.as_bytes());
    }

    #[test]
    fn sign_produces_verifiable_signature() {
        let kp = KeyPair::generate();
        let msg = crate::hash::double_sha256(b"hello nxf");
        let sig = kp.sign(&msg);
        assert!(crate::signing::verify_transaction_signature(&kp.public_key, &msg, &sig).is_ok());
    }
}
