use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use nxf_core::transaction::Transaction;
use nxf_core::types::{AccountId, TxId};
use nxf_crypto::{decode_address, encode_address};
use nxf_ledger::LedgerEngine;
use nxf_validator::{sanitize_for_client, validate};

use crate::api::NxfApiServer;
use crate::types::{RpcAccount, RpcGenesisInfo, RpcLedger, RpcNetworkInfo, RpcStake, RpcTransaction, RpcTrustLine};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

fn bad_request(msg: impl Into<String>) -> ErrorObject<'static> {
    rpc_err(-32602, msg)
}

fn internal(msg: impl Into<String>) -> ErrorObject<'static> {
    rpc_err(-32603, msg)
}

/// Shared state behind every RPC handler. Cheap to clone (everything is
/// already behind an `Arc`); one instance is built at node startup and
/// handed to [`RpcServer::new`].
pub struct RpcServerState {
    pub engine: Arc<LedgerEngine>,
    /// Pool-admission channel; the node's main loop drains this and
    /// batches transactions into consensus rounds.
    pub tx_sender: tokio::sync::mpsc::Sender<Transaction>,
    pub node_id: String,
    pub listen_addr: String,
    pub protocol_version: u32,
    pub genesis_timestamp: i64,
    /// Updated by the node's P2P loop; read here for `nxf_getNetworkInfo`.
    pub peer_count: Arc<AtomicUsize>,
}

/// The RPC server implementation: a thin translation layer over
/// `nxf-ledger`'s read path and the pool-admission channel. Never mutates
/// ledger state directly — `sendTransaction` only enqueues for the next
/// ledger close.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS headers.
    /// Returns a handle the caller can `.stop()` during shutdown.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "rpc server started");
        Ok(handle)
    }
}

fn account_to_rpc(account: &nxf_core::account::Account) -> RpcAccount {
    RpcAccount {
        account_id: encode_address(&account.account_id),
        balance_drops: account.balance.to_string(),
        spendable_drops: account.spendable_balance().to_string(),
        sequence: account.sequence,
        owner_count: account.owner_count,
        flags: account.flags.0,
        transfer_rate: account.transfer_rate,
        regular_key: account.regular_key.as_ref().map(|k| hex::encode(k.as_bytes())),
        trust_lines: account
            .trust_lines
            .iter()
            .map(|(key, line)| {
                let currency: nxf_core::types::CurrencyCode = key.currency.clone().into();
                RpcTrustLine {
                    currency: currency.to_string(),
                    issuer: encode_address(&key.issuer),
                    balance_drops: line.balance.to_string(),
                    limit_drops: line.limit.to_string(),
                    frozen: line.frozen,
                    authorized: line.authorized,
                }
            })
            .collect(),
    }
}

#[async_trait]
impl NxfApiServer for RpcServer {
    async fn get_account(&self, address: String) -> RpcResult<Option<RpcAccount>> {
        let id: AccountId = decode_address(&address).map_err(|e| bad_request(e.to_string()))?;
        let account = self.state.engine.db().get_account(&id).map_err(|e| internal(e.to_string()))?;
        Ok(account.as_ref().map(account_to_rpc))
    }

    async fn get_balance(&self, address: String) -> RpcResult<String> {
        let id: AccountId = decode_address(&address).map_err(|e| bad_request(e.to_string()))?;
        let balance = self
            .state
            .engine
            .db()
            .get_account(&id)
            .map_err(|e| internal(e.to_string()))?
            .map(|a| a.balance)
            .unwrap_or(0);
        Ok(balance.to_string())
    }

    async fn send_transaction(&self, tx_json: serde_json::Value) -> RpcResult<String> {
        let tx: Transaction = serde_json::from_value(tx_json).map_err(|e| bad_request(format!("invalid transaction: {e}")))?;

        if let Err(result) = validate(&tx, self.state.engine.as_ref()) {
            return Err(bad_request(sanitize_for_client(result)).into());
        }

        let tx_id = hex::encode(tx.tx_id.as_bytes());
        self.state
            .tx_sender
            .send(tx)
            .await
            .map_err(|_| internal("transaction pool is not accepting submissions"))?;
        Ok(tx_id)
    }

    async fn get_transaction(&self, tx_id: String) -> RpcResult<Option<RpcTransaction>> {
        let bytes = hex::decode(&tx_id).map_err(|e| bad_request(format!("invalid tx id: {e}")))?;
        let id = TxId::from_bytes(bytes.try_into().map_err(|_| bad_request("tx id must be 32 bytes"))?);
        let stored = self.state.engine.db().get_transaction(&id).map_err(|e| internal(e.to_string()))?;
        Ok(stored.map(|s| RpcTransaction {
            tx_id: hex::encode(s.tx.tx_id.as_bytes()),
            account: encode_address(&s.tx.account),
            sequence: s.tx.sequence,
            fee_drops: s.tx.fee.to_string(),
            result: s.result.to_string(),
            ledger_seq: s.ledger_seq,
        }))
    }

    async fn get_ledger(&self, sequence: Option<u32>) -> RpcResult<Option<RpcLedger>> {
        let header = match sequence {
            Some(seq) => self.state.engine.db().get_ledger_header(seq),
            None => self.state.engine.db().latest_ledger_header(),
        }
        .map_err(|e| internal(e.to_string()))?;

        Ok(header.map(|h| RpcLedger {
            sequence: h.sequence,
            hash: hex::encode(h.hash),
            parent_hash: hex::encode(h.parent_hash),
            close_time: h.close_time,
            tx_count: h.tx_count,
            total_nxf_drops: h.total_nxf_drops.to_string(),
        }))
    }

    async fn get_stake(&self, stake_id: String) -> RpcResult<Option<RpcStake>> {
        let bytes = hex::decode(&stake_id).map_err(|e| bad_request(format!("invalid stake id: {e}")))?;
        let id = TxId::from_bytes(bytes.try_into().map_err(|_| bad_request("stake id must be 32 bytes"))?);
        let record = self.state.engine.db().get_stake(&id).map_err(|e| internal(e.to_string()))?;

        let Some(record) = record else { return Ok(None) };
        let now = chrono::Utc::now().timestamp();
        let summary = nxf_staking::StakeSummary::from_record(&record, now);

        Ok(Some(RpcStake {
            stake_id: hex::encode(summary.stake_id.as_bytes()),
            owner: encode_address(&record.owner),
            principal_drops: summary.principal.to_string(),
            tier: format!("{:?}", record.tier),
            effective_apy: summary.effective_apy,
            maturity_time: summary.maturity_time,
            matured: summary.matured,
            cancelled: summary.cancelled,
            is_flexible: summary.is_flexible,
            projected_payout_drops: summary.projected_payout.to_string(),
        }))
    }

    async fn get_network_info(&self) -> RpcResult<RpcNetworkInfo> {
        let ledger_seq = self.state.engine.current_sequence().map_err(|e| internal(e.to_string()))?;
        Ok(RpcNetworkInfo {
            node_id: self.state.node_id.clone(),
            listen_addr: self.state.listen_addr.clone(),
            peer_count: self.state.peer_count.load(Ordering::Relaxed),
            ledger_seq,
            protocol_version: self.state.protocol_version,
        })
    }

    async fn get_genesis_info(&self) -> RpcResult<RpcGenesisInfo> {
        Ok(RpcGenesisInfo::current(self.state.genesis_timestamp))
    }
}
