use blake2::Blake2b;
use blake2::digest::consts::U32;
use blake2::Digest as _;
use ripemd::Ripemd160;
use sha2::{Digest as _, Sha256};

/// SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 applied twice, as used by the transaction signing blob.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// BLAKE2b with a 256-bit digest, used for ledger header and state hashing.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// RIPEMD-160 of arbitrary bytes, used in address derivation.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// hash160(x) = RIPEMD160(SHA256(x)), the standard address-derivation digest.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}
