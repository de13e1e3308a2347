//! nxf-node — the NXF full-node binary.
//!
//! Startup sequence:
//!   1. Load configuration (TOML file, overridden by CLI flags)
//!   2. Open (or initialise) the ledger database
//!   3. Apply genesis if the database is fresh
//!   4. Start the P2P network (plain TCP, newline-delimited JSON)
//!   5. Start the JSON-RPC 2.0 server
//!   6. Run the main loop: admit transactions, drive RPCA consensus rounds,
//!      close ledgers, and keep the local chain caught up with peers.

mod config;
mod identity;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use nxf_consensus::{ConsensusResult, ConsensusRound, Proposal, UnlConfig};
use nxf_core::constants::{
    PROPOSAL_WAIT_SECS, SYNC_DATA_TIMEOUT_SECS, SYNC_DELTA_CHUNK_ACCOUNTS, SYNC_STATUS_TIMEOUT_SECS,
};
use nxf_core::transaction::Transaction;
use nxf_core::types::TxId;
use nxf_crypto::{decode_address, encode_address};
use nxf_genesis::{apply_genesis, GenesisParams};
use nxf_ledger::{LedgerDb, LedgerEngine};
use config::NodeConfig;
use nxf_p2p::{Inbound, P2pConfig, P2pHandle, P2pMessage, P2pNetwork};
use nxf_rpc::server::RpcServerState;
use nxf_rpc::RpcServer;
use nxf_sync::{chunk_bounds, install_delta, install_snapshot, plan_sync, DeltaLedger, PeerStatus, SyncPlan, SyncStatus};
use nxf_validator::validate;

use identity::load_or_create_identity;

#[derive(Parser, Debug)]
#[command(name = "nxf-node", version, about = "NXF full node — federated-consensus ledger")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "nxf.toml")]
    config: std::path::PathBuf,

    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    #[arg(long)]
    p2p_listen: Option<String>,

    #[arg(long)]
    rpc_addr: Option<std::net::SocketAddr>,

    /// Bootstrap peer addresses, comma-separated, appended to the config file's list.
    #[arg(long, value_delimiter = ',')]
    bootstrap: Vec<String>,

    /// UNL member addresses, comma-separated, appended to the config file's list.
    #[arg(long, value_delimiter = ',')]
    unl: Vec<String>,

    #[arg(long)]
    identity_file: Option<std::path::PathBuf>,

    #[arg(long)]
    genesis_params: Option<std::path::PathBuf>,
}

fn apply_overrides(mut config: NodeConfig, args: &Args) -> NodeConfig {
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(listen) = &args.p2p_listen {
        config.p2p_listen = listen.clone();
    }
    if let Some(addr) = args.rpc_addr {
        config.rpc_addr = addr;
    }
    config.bootstrap_peers.extend(args.bootstrap.iter().cloned());
    config.unl.extend(args.unl.iter().cloned());
    if let Some(path) = &args.identity_file {
        config.identity_file = path.clone();
    }
    if args.genesis_params.is_some() {
        config.genesis_params = args.genesis_params.clone();
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,nxf=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = apply_overrides(NodeConfig::load(&args.config)?, &args);
    info!("NXF node starting");

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let identity = load_or_create_identity(&config.identity_path()).context("loading node identity")?;
    let node_id = encode_address(&identity.account_id);
    info!(%node_id, "node identity loaded");

    let db = Arc::new(LedgerDb::open(&config.data_dir).context("opening ledger database")?);

    if db.latest_ledger_header()?.is_none() {
        info!("fresh database — applying genesis");
        let params = load_or_default_genesis_params(config.genesis_params.as_deref(), &identity)?;
        apply_genesis(&db, &params).context("applying genesis")?;
    } else {
        info!("existing database found — skipping genesis");
    }

    let genesis_timestamp = db
        .get_ledger_header(0)?
        .map(|h| h.close_time)
        .unwrap_or(nxf_genesis::params::DEFAULT_GENESIS_TIMESTAMP);

    let engine = Arc::new(LedgerEngine::new(Arc::clone(&db)));

    let (tx_sender, mut tx_receiver) = mpsc::channel::<Transaction>(512);

    let p2p_config = P2pConfig {
        listen_addr: config.p2p_listen.clone(),
        bootstrap_peers: config.bootstrap_peers.clone(),
        protocol_version: config.protocol_version,
        ..Default::default()
    };
    let public_key_hex = hex::encode(identity.public_key.as_bytes());
    let (network, mut p2p_handle) = P2pNetwork::new(p2p_config, node_id.clone(), Some(public_key_hex));
    let peer_count = network.peer_count_handle();
    tokio::spawn(network.run());

    let rpc_state = Arc::new(RpcServerState {
        engine: Arc::clone(&engine),
        tx_sender: tx_sender.clone(),
        node_id: node_id.clone(),
        listen_addr: config.p2p_listen.clone(),
        protocol_version: config.protocol_version,
        genesis_timestamp,
        peer_count,
    });
    let rpc_handle = RpcServer::new(rpc_state)
        .start(config.rpc_addr)
        .await
        .context("starting RPC server")?;
    info!(addr = %config.rpc_addr, "rpc ready");

    let unl_members: Vec<_> = config
        .unl
        .iter()
        .filter_map(|addr| match decode_address(addr) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(addr, error = %e, "skipping malformed UNL entry");
                None
            }
        })
        .collect();
    let unl = UnlConfig::new(identity.account_id, unl_members, None);

    let shutdown = CancellationToken::new();
    let shutdown_for_signal = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        shutdown_for_signal.cancel();
    });

    let mut pending: BTreeMap<TxId, Transaction> = BTreeMap::new();
    let mut consensus_tick = tokio::time::interval(Duration::from_secs(config.consensus_interval_secs.max(1)));
    consensus_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut sync_tick = tokio::time::interval(Duration::from_secs_f64((config.sync_cooldown_secs).max(1.0)));
    sync_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("node ready");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            Some(tx) = tx_receiver.recv() => {
                admit(&mut p2p_handle, &engine, &mut pending, tx).await;
            }

            Some(inbound) = p2p_handle.recv() => {
                handle_inbound(&mut p2p_handle, &db, &engine, &mut pending, inbound).await;
            }

            _ = consensus_tick.tick() => {
                run_consensus_round(&mut p2p_handle, &engine, &db, &unl, &mut pending).await;
            }

            _ = sync_tick.tick() => {
                run_sync_once(&mut p2p_handle, &db, &engine).await;
            }
        }
    }

    info!(grace_secs = config.shutdown_grace_secs, "shutting down");
    let _ = timeout(Duration::from_secs(config.shutdown_grace_secs), rpc_handle.stopped()).await;
    db.flush().ok();
    Ok(())
}

fn load_or_default_genesis_params(
    path: Option<&std::path::Path>,
    identity: &nxf_crypto::KeyPair,
) -> anyhow::Result<GenesisParams> {
    if let Some(p) = path {
        let json = std::fs::read_to_string(p).with_context(|| format!("reading genesis params from {}", p.display()))?;
        return serde_json::from_str(&json).context("parsing genesis params JSON");
    }
    warn!("no --genesis-params provided; founding from this node's own identity — DO NOT USE IN PRODUCTION");
    Ok(GenesisParams::new(identity.public_key.clone()))
}

/// Validate and admit a freshly-submitted or gossiped transaction into the
/// local pool, then gossip it onward.
async fn admit(
    handle: &mut P2pHandle,
    engine: &LedgerEngine,
    pending: &mut BTreeMap<TxId, Transaction>,
    tx: Transaction,
) {
    if pending.contains_key(&tx.tx_id) {
        return;
    }
    if let Err(result) = validate(&tx, engine) {
        warn!(tx_id = %tx.tx_id, %result, "rejected transaction at pool admission");
        return;
    }
    handle.broadcast(P2pMessage::Tx { tx: tx.clone() });
    pending.insert(tx.tx_id, tx);
}

/// Handles one inbound P2P message outside of an active consensus round or
/// sync operation: transaction gossip, liveness, and read-only request/
/// response queries (ledger header, sync status/delta/snapshot).
async fn handle_inbound(
    handle: &mut P2pHandle,
    db: &LedgerDb,
    engine: &LedgerEngine,
    pending: &mut BTreeMap<TxId, Transaction>,
    inbound: Inbound,
) {
    match inbound.message {
        P2pMessage::Tx { tx } => admit(handle, engine, pending, tx).await,
        P2pMessage::LedgerReq => {
            if let Ok(Some(header)) = db.latest_ledger_header() {
                handle.send_to(&inbound.from, P2pMessage::LedgerRes { header });
            }
        }
        P2pMessage::SyncStatusReq => {
            if let Some(status) = local_sync_status(db) {
                handle.send_to(&inbound.from, P2pMessage::SyncStatusRes { status });
            }
        }
        P2pMessage::SyncDeltaReq { from, to } => {
            if let Ok(ledgers) = build_delta(db, from, to) {
                handle.send_to(&inbound.from, P2pMessage::SyncDeltaRes { ledgers });
            }
        }
        P2pMessage::SyncSnapReq => respond_snapshot(handle, db, &inbound.from),
        P2pMessage::ConsensusOk { ledger_seq, .. } => {
            info!(peer = %inbound.from, ledger_seq, "peer reports ledger closed");
        }
        // Proposals and sync responses outside of an active round/sync
        // operation carry no actionable state and are dropped.
        _ => {}
    }
}

fn local_sync_status(db: &LedgerDb) -> Option<SyncStatus> {
    let header = db.latest_ledger_header().ok()??;
    Some(SyncStatus { ledger_seq: header.sequence, ledger_hash: header.hash })
}

fn build_delta(db: &LedgerDb, from: u32, to: u32) -> Result<Vec<DeltaLedger>, nxf_core::NxfError> {
    let mut out = Vec::new();
    for seq in (from + 1)..=to {
        let Some(header) = db.get_ledger_header(seq)? else { break };
        let transactions = db
            .iter_transactions_in_replay_order()?
            .into_iter()
            .filter(|stored| stored.ledger_seq == seq)
            .map(|stored| (stored.tx, stored.result))
            .collect();
        out.push(DeltaLedger { header, transactions });
    }
    Ok(out)
}

fn respond_snapshot(handle: &mut P2pHandle, db: &LedgerDb, peer: &str) {
    let Ok(Some(header)) = db.latest_ledger_header() else { return };
    let Ok(accounts) = db.iter_accounts_by_address() else { return };
    let bounds = chunk_bounds(accounts.len());
    let chunk_count = bounds.len().max(1) as u32;
    if bounds.is_empty() {
        handle.send_to(
            peer,
            P2pMessage::SyncSnapRes { header, accounts: Vec::new(), chunk_index: 0, chunk_count: 1 },
        );
        return;
    }
    for (i, (start, end)) in bounds.into_iter().enumerate() {
        handle.send_to(
            peer,
            P2pMessage::SyncSnapRes {
                header: header.clone(),
                accounts: accounts[start..end].to_vec(),
                chunk_index: i as u32,
                chunk_count,
            },
        );
    }
}

/// Drives one RPCA consensus instance for the next ledger sequence: proposes
/// the local pool's tx-ids, exchanges proposals with the UNL over the
/// existing P2P connections for up to `PROPOSAL_WAIT_SECS` per round, and
/// closes the ledger once the round machine accepts a result.
async fn run_consensus_round(
    handle: &mut P2pHandle,
    engine: &LedgerEngine,
    db: &LedgerDb,
    unl: &UnlConfig,
    pending: &mut BTreeMap<TxId, Transaction>,
) {
    let ledger_seq = match engine.current_sequence() {
        Ok(seq) => seq.saturating_add(1),
        Err(e) => {
            warn!(error = %e, "failed to read current ledger sequence");
            return;
        }
    };

    let mut round = ConsensusRound::new(unl.clone(), ledger_seq, pending.keys().copied().collect());
    if let Some(proposal) = round.own_proposal() {
        handle.broadcast(P2pMessage::Proposal { proposal });
    }

    let result = loop {
        let deadline = Duration::from_secs_f64(PROPOSAL_WAIT_SECS);
        let round_number = round.round_number();
        let wait_until = tokio::time::Instant::now() + deadline;

        while tokio::time::Instant::now() < wait_until {
            match timeout(wait_until - tokio::time::Instant::now(), handle.recv()).await {
                Ok(Some(inbound)) => match inbound.message {
                    P2pMessage::Proposal { proposal } => {
                        let _ = round.submit_proposal(proposal);
                    }
                    other => {
                        handle_inbound(handle, db, engine, pending, Inbound { from: inbound.from, message: other }).await;
                    }
                },
                Ok(None) => break,
                Err(_) => break,
            }
        }

        if let Some(result) = round.tally_and_advance() {
            break Some(result);
        }
        if round.round_number() == round_number && round.phase() == nxf_consensus::Phase::Failed {
            break None;
        }
        if let Some(proposal) = round.own_proposal() {
            handle.broadcast(P2pMessage::Proposal { proposal });
        }
    };

    let Some(result) = result else {
        warn!(ledger_seq, "consensus round failed to converge within the round budget");
        return;
    };

    if !result.byzantine_excluded.is_empty() {
        warn!(ledger_seq, excluded = result.byzantine_excluded.len(), "excluded Byzantine validators this round");
    }

    close_agreed_ledger(handle, engine, pending, result).await;
}

async fn close_agreed_ledger(
    handle: &mut P2pHandle,
    engine: &LedgerEngine,
    pending: &mut BTreeMap<TxId, Transaction>,
    result: ConsensusResult,
) {
    let txs: Vec<Transaction> = result
        .agreed_tx_ids
        .iter()
        .filter_map(|id| pending.get(id).cloned())
        .collect();

    let now = chrono::Utc::now().timestamp();
    match engine.close_ledger(txs, now) {
        Ok((header, _results)) => {
            for id in &result.agreed_tx_ids {
                pending.remove(id);
            }
            handle.broadcast(P2pMessage::ConsensusOk { ledger_seq: header.sequence, tx_ids: result.agreed_tx_ids });
            info!(sequence = header.sequence, "ledger closed via consensus");
        }
        Err(e) => warn!(error = %e, "failed to close agreed ledger"),
    }
}

/// Compares this node's tip against the UNL over `SyncStatusReq`/`Res`, and
/// if behind, catches up by replay or full snapshot. Runs on the same
/// single-consumer P2P handle as consensus, so it never overlaps a
/// consensus round in practice.
async fn run_sync_once(handle: &mut P2pHandle, db: &LedgerDb, engine: &LedgerEngine) {
    let Some(local) = local_sync_status(db) else { return };

    handle.broadcast(P2pMessage::SyncStatusReq);
    let mut peers = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(SYNC_STATUS_TIMEOUT_SECS);
    while tokio::time::Instant::now() < deadline {
        match timeout(deadline - tokio::time::Instant::now(), handle.recv()).await {
            Ok(Some(inbound)) => {
                if let P2pMessage::SyncStatusRes { status } = inbound.message {
                    peers.push(PeerStatus { peer: inbound.from, status, received_at: std::time::Instant::now() });
                }
            }
            _ => break,
        }
    }

    match plan_sync(local, &peers) {
        SyncPlan::UpToDate => {}
        SyncPlan::Delta { peer, from, to } => {
            handle.send_to(&peer, P2pMessage::SyncDeltaReq { from, to });
            if let Some(ledgers) = await_delta(handle, &peer).await {
                if let Err(e) = install_delta(db, engine, ledgers) {
                    warn!(error = %e, "delta sync install failed");
                }
            }
        }
        SyncPlan::Snapshot { peer, .. } => {
            handle.send_to(&peer, P2pMessage::SyncSnapReq);
            if let Some((header, accounts)) = await_snapshot(handle, &peer).await {
                if let Err(e) = install_snapshot(db, header, accounts) {
                    warn!(error = %e, "snapshot sync install failed");
                }
            }
        }
    }
}

async fn await_delta(handle: &mut P2pHandle, peer: &str) -> Option<Vec<DeltaLedger>> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(SYNC_DATA_TIMEOUT_SECS);
    while tokio::time::Instant::now() < deadline {
        match timeout(deadline - tokio::time::Instant::now(), handle.recv()).await {
            Ok(Some(inbound)) if inbound.from == peer => {
                if let P2pMessage::SyncDeltaRes { ledgers } = inbound.message {
                    return Some(ledgers);
                }
            }
            Ok(Some(_)) => continue,
            _ => break,
        }
    }
    None
}

async fn await_snapshot(handle: &mut P2pHandle, peer: &str) -> Option<(nxf_core::ledger_header::LedgerHeader, Vec<nxf_core::account::Account>)> {
    let mut accounts = Vec::with_capacity(SYNC_DELTA_CHUNK_ACCOUNTS);
    let mut header = None;
    let deadline = tokio::time::Instant::now() + Duration::from_secs_f64(SYNC_DATA_TIMEOUT_SECS);
    while tokio::time::Instant::now() < deadline {
        match timeout(deadline - tokio::time::Instant::now(), handle.recv()).await {
            Ok(Some(inbound)) if inbound.from == peer => {
                if let P2pMessage::SyncSnapRes { header: h, accounts: chunk, chunk_index, chunk_count } = inbound.message {
                    header = Some(h);
                    accounts.extend(chunk);
                    if chunk_index + 1 >= chunk_count {
                        return header.map(|h| (h, accounts));
                    }
                }
            }
            Ok(Some(_)) => continue,
            _ => break,
        }
    }
    None
}
