//! Peer-to-peer wire protocol and dispatch: newline-delimited JSON
//! messages over plain TCP, flood-with-dedup gossip for transactions and
//! consensus proposals, and request/response routing for ledger and sync
//! queries, matched by peer connection identity.

pub mod config;
pub mod message;
pub mod network;
pub mod seen;

pub use config::P2pConfig;
pub use message::P2pMessage;
pub use network::{is_connectable_peer_addr, Inbound, P2pHandle, P2pNetwork};
pub use seen::SeenCache;
