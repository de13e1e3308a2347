use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{RpcAccount, RpcGenesisInfo, RpcLedger, RpcNetworkInfo, RpcStake, RpcTransaction};

/// NXF JSON-RPC 2.0 API. Methods are prefixed `nxf_` via `namespace =
/// "nxf"`. Intentionally thin per the workspace's scope: no pagination,
/// search, or dashboard-shaped queries — that surface belongs to the
/// out-of-scope REST/WebSocket layer.
#[rpc(server, client, namespace = "nxf")]
pub trait NxfApi {
    /// Full account state, including trust lines, by Base58Check address.
    #[method(name = "getAccount")]
    async fn get_account(&self, address: String) -> RpcResult<Option<RpcAccount>>;

    /// Native-drops balance by Base58Check address.
    #[method(name = "getBalance")]
    async fn get_balance(&self, address: String) -> RpcResult<String>;

    /// Submit a signed transaction for pool admission. `tx_json` is the
    /// transaction encoded as JSON. Returns the tx-id hex on acceptance
    /// into the pool; does not imply the transaction has been applied —
    /// that happens at the next ledger close.
    #[method(name = "sendTransaction")]
    async fn send_transaction(&self, tx_json: serde_json::Value) -> RpcResult<String>;

    /// A closed transaction and its result by tx-id hex.
    #[method(name = "getTransaction")]
    async fn get_transaction(&self, tx_id: String) -> RpcResult<Option<RpcTransaction>>;

    /// A closed ledger header by sequence; omit for the current tip.
    #[method(name = "getLedger")]
    async fn get_ledger(&self, sequence: Option<u32>) -> RpcResult<Option<RpcLedger>>;

    /// A stake record's read-only projection by stake-id hex.
    #[method(name = "getStake")]
    async fn get_stake(&self, stake_id: String) -> RpcResult<Option<RpcStake>>;

    /// This node's P2P identity, peer count, and current tip.
    #[method(name = "getNetworkInfo")]
    async fn get_network_info(&self) -> RpcResult<RpcNetworkInfo>;

    /// Genesis and protocol constants.
    #[method(name = "getGenesisInfo")]
    async fn get_genesis_info(&self) -> RpcResult<RpcGenesisInfo>;
}
