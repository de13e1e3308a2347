use nxf_core::constants::{P2P_SEEN_CACHE_CAPACITY, PROTOCOL_VERSION};

/// Configuration for the plain-TCP JSON-line P2P network.
#[derive(Debug, Clone)]
pub struct P2pConfig {
    /// Local listen address, e.g. `0.0.0.0:7777`.
    pub listen_addr: String,
    /// `host:port` addresses of peers to dial at startup.
    pub bootstrap_peers: Vec<String>,
    /// Wire protocol version advertised in `HELLO`; connections from a
    /// mismatched peer are logged and dropped.
    pub protocol_version: u32,
    /// Capacity of the seen-tx and seen-proposal dedup caches.
    pub seen_cache_capacity: usize,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7777".into(),
            bootstrap_peers: Vec::new(),
            protocol_version: PROTOCOL_VERSION,
            seen_cache_capacity: P2P_SEEN_CACHE_CAPACITY,
        }
    }
}
