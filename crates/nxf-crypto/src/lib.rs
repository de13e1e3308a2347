pub mod address;
pub mod hash;
pub mod keypair;
pub mod signing;

pub use address::{account_id_from_public_key, decode_address, encode_address};
pub use hash::{blake2b_256, double_sha256, hash160, ripemd160, sha256};
pub use keypair::KeyPair;
pub use signing::{sign_transaction, verify_transaction_signature};
