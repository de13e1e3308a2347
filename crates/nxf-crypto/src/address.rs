use nxf_core::constants::ADDRESS_VERSION_BYTE;
use nxf_core::types::{AccountId, PublicKey};

use crate::hash::hash160;

/// Derive an account's address from its compressed secp256k1 public key:
/// `RIPEMD160(SHA256(pubkey))`.
pub fn account_id_from_public_key(public_key: &PublicKey) -> AccountId {
    AccountId::from_bytes(hash160(public_key.as_bytes()))
}

/// Render an `AccountId` as the network's human-readable address.
pub fn encode_address(account_id: &AccountId) -> String {
    account_id.to_base58check(ADDRESS_VERSION_BYTE)
}

/// Parse a human-readable address back into an `AccountId`, validating the
/// Base58Check checksum and version byte.
pub fn decode_address(address: &str) -> Result<AccountId, nxf_core::NxfError> {
    AccountId::from_base58check(address, ADDRESS_VERSION_BYTE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPair;

    #[test]
    fn address_round_trips() {
        let kp = KeyPair::generate();
        let addr = encode_address(&kp.account_id);
        let decoded = decode_address(&addr).unwrap();
        assert_eq!(decoded, kp.account_id);
    }

    #[test]
    fn address_starts_with_expected_tag() {
        // Base58Check output is prefix-biased by the version byte, not
        // guaranteed to start with a fixed character, but should at least
        // decode successfully for every freshly generated key.
        let kp = KeyPair::generate();
        let addr = encode_address(&kp.account_id);
        assert!(decode_address(&addr).is_ok());
    }
}
