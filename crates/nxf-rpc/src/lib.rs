//! Thin JSON-RPC 2.0 surface for an NXF node.
//!
//! Namespace: "nxf". Methods: `nxf_getAccount`, `nxf_getBalance`,
//! `nxf_sendTransaction`, `nxf_getTransaction`, `nxf_getLedger`,
//! `nxf_getStake`, `nxf_getNetworkInfo`, `nxf_getGenesisInfo`. No
//! pagination, search, or dashboard-shaped endpoints — this surface only
//! drives and observes the five core subsystems.

pub mod api;
pub mod server;
pub mod types;

pub use api::{NxfApiClient, NxfApiServer};
pub use server::{RpcServer, RpcServerState};
pub use types::{RpcAccount, RpcGenesisInfo, RpcLedger, RpcNetworkInfo, RpcStake, RpcTransaction, RpcTrustLine};
