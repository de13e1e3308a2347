use nxf_core::types::{PublicKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Default genesis close time: 2024-01-01T00:00:00Z.
pub const DEFAULT_GENESIS_TIMESTAMP: Timestamp = 1_704_067_200;

/// Parameters for founding a new NXF network. In production the
/// foundation key comes from a key ceremony; tests generate a fresh
/// keypair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisParams {
    /// Public key controlling the account that receives the entire
    /// genesis supply. The one legitimate non-conservation funding
    /// event in the protocol's lifetime.
    pub foundation_key: PublicKey,
    pub close_time: Timestamp,
}

impl GenesisParams {
    pub fn new(foundation_key: PublicKey) -> Self {
        Self { foundation_key, close_time: DEFAULT_GENESIS_TIMESTAMP }
    }
}
