use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use nxf_core::transaction::Transaction;

/// Simple JSON-RPC 2.0 client used by the wallet to talk to a running node.
///
/// Uses raw HTTP POST with serde_json rather than the full jsonrpsee client
/// to keep the wallet binary lean and dependency-minimal.
pub struct WalletRpcClient {
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTrustLine {
    pub currency: String,
    pub issuer: String,
    pub balance_drops: String,
    pub limit_drops: String,
    pub frozen: bool,
    pub authorized: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcAccount {
    pub account_id: String,
    pub balance_drops: String,
    pub spendable_drops: String,
    pub sequence: u32,
    pub owner_count: u32,
    pub flags: u32,
    pub transfer_rate: u32,
    pub regular_key: Option<String>,
    pub trust_lines: Vec<RpcTrustLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcStake {
    pub stake_id: String,
    pub owner: String,
    pub principal_drops: String,
    pub tier: String,
    pub effective_apy: f64,
    pub maturity_time: i64,
    pub matured: bool,
    pub cancelled: bool,
    pub is_flexible: bool,
    pub projected_payout_drops: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcGenesisInfo {
    pub protocol: String,
    pub ticker: String,
    pub drops_per_nxf: u64,
    pub total_supply_drops: String,
    pub genesis_timestamp: i64,
    pub account_reserve_drops: String,
    pub owner_reserve_drops: String,
    pub min_fee_drops: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcNetworkInfo {
    pub node_id: String,
    pub listen_addr: String,
    pub peer_count: usize,
    pub ledger_seq: u32,
    pub protocol_version: u32,
}

impl WalletRpcClient {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string(), client: reqwest::Client::new() }
    }

    /// Call a JSON-RPC method and return the `result` field.
    async fn call(&self, method: &str, params: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("connecting to node at {}", self.url))?;

        let json: serde_json::Value = resp.json().await.context("parsing RPC response")?;

        if let Some(err) = json.get("error") {
            bail!("RPC error: {}", err);
        }

        Ok(json["result"].clone())
    }

    /// Full account state, or `None` for an address with no account yet.
    pub async fn get_account(&self, address: &str) -> anyhow::Result<Option<RpcAccount>> {
        let result = self.call("nxf_getAccount", serde_json::json!([address])).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result).context("parsing account response")
    }

    /// Next sequence number to use when signing a transaction from `address`.
    pub async fn next_sequence(&self, address: &str) -> anyhow::Result<u32> {
        match self.get_account(address).await? {
            Some(account) => Ok(account.sequence + 1),
            None => Ok(1),
        }
    }

    /// Native-drops balance. Zero for an address with no account yet.
    pub async fn get_balance(&self, address: &str) -> anyhow::Result<u64> {
        let result = self.call("nxf_getBalance", serde_json::json!([address])).await?;
        let balance_str = result.as_str().context("expected string balance")?;
        balance_str.parse().context("parsing balance")
    }

    /// Submit a signed transaction. Returns the tx-id hex on pool admission.
    pub async fn send_transaction(&self, tx: &Transaction) -> anyhow::Result<String> {
        let tx_json = serde_json::to_value(tx).context("encoding transaction")?;
        let result = self.call("nxf_sendTransaction", serde_json::json!([tx_json])).await?;
        result.as_str().map(|s| s.to_string()).context("expected tx_id string from sendTransaction")
    }

    pub async fn get_stake(&self, stake_id_hex: &str) -> anyhow::Result<Option<RpcStake>> {
        let result = self.call("nxf_getStake", serde_json::json!([stake_id_hex])).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result).context("parsing stake response")
    }

    pub async fn get_network_info(&self) -> anyhow::Result<RpcNetworkInfo> {
        let result = self.call("nxf_getNetworkInfo", serde_json::json!([])).await?;
        serde_json::from_value(result).context("parsing network info")
    }

    /// Get genesis/protocol info.
    pub async fn get_genesis_info(&self) -> anyhow::Result<RpcGenesisInfo> {
        let result = self.call("nxf_getGenesisInfo", serde_json::json!([])).await?;
        serde_json::from_value(result).context("parsing genesis info")
    }
}
