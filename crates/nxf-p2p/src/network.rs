use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nxf_core::types::TxId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::P2pConfig;
use crate::message::P2pMessage;
use crate::seen::SeenCache;

/// A message delivered from a peer, tagged with that peer's node id so the
/// node can route request/response pairs (`LEDGER_REQ`/`SYNC_*_REQ`
/// answered with `send_to`) without a separate request-id scheme: each
/// connection carries at most one outstanding request, keyed by the peer
/// that asked.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub from: String,
    pub message: P2pMessage,
}

enum Outbound {
    Broadcast { exclude: Option<String>, message: P2pMessage },
    SendTo { peer: String, message: P2pMessage },
}

/// Application-facing handle returned from `P2pNetwork::new`.
pub struct P2pHandle {
    local_node_id: String,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
}

impl P2pHandle {
    pub fn local_node_id(&self) -> &str {
        &self.local_node_id
    }

    /// Send `message` to every connected peer.
    pub fn broadcast(&self, message: P2pMessage) {
        let _ = self.outbound_tx.send(Outbound::Broadcast { exclude: None, message });
    }

    /// Send `message` to every connected peer except `exclude`, used when
    /// re-gossiping something that just arrived from that peer.
    pub fn broadcast_except(&self, exclude: &str, message: P2pMessage) {
        let _ = self
            .outbound_tx
            .send(Outbound::Broadcast { exclude: Some(exclude.to_string()), message });
    }

    /// Send `message` to one specific peer by node id, e.g. answering a
    /// sync request back to its requester.
    pub fn send_to(&self, peer: &str, message: P2pMessage) {
        let _ = self.outbound_tx.send(Outbound::SendTo { peer: peer.to_string(), message });
    }

    /// Receive the next message forwarded up from the network layer.
    pub async fn recv(&mut self) -> Option<Inbound> {
        self.inbound_rx.recv().await
    }
}

struct PeerHandle {
    tx: mpsc::UnboundedSender<P2pMessage>,
}

type Registry = Arc<Mutex<HashMap<String, PeerHandle>>>;

/// Plain-TCP, newline-delimited-JSON peer-to-peer network. No gossip mesh
/// library: NXF's validator set is UNL-bounded, so flood-with-dedup over a
/// direct mesh of TCP connections is sufficient (distilled spec §6).
pub struct P2pNetwork {
    config: P2pConfig,
    node_id: String,
    public_key_hex: Option<String>,
    registry: Registry,
    inbound_tx: mpsc::Sender<Inbound>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    seen_tx: Arc<Mutex<SeenCache<TxId>>>,
    seen_proposal: Arc<Mutex<SeenCache<[u8; 32]>>>,
    peer_count: Arc<AtomicUsize>,
}

struct LocalInfo {
    node_id: String,
    public_key_hex: Option<String>,
    listen_port: u16,
    protocol_version: u32,
}

impl P2pNetwork {
    /// Build the network and return `(P2pNetwork, P2pHandle)`. `node_id`
    /// should be the node's address string (stable across restarts);
    /// `public_key_hex` is advertised in `HELLO` so peers can verify
    /// signed proposals from this validator.
    pub fn new(config: P2pConfig, node_id: String, public_key_hex: Option<String>) -> (Self, P2pHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::channel(256);

        let network = P2pNetwork {
            seen_tx: Arc::new(Mutex::new(SeenCache::new(config.seen_cache_capacity))),
            seen_proposal: Arc::new(Mutex::new(SeenCache::new(config.seen_cache_capacity))),
            registry: Arc::new(Mutex::new(HashMap::new())),
            node_id: node_id.clone(),
            public_key_hex,
            config,
            inbound_tx,
            outbound_rx,
            peer_count: Arc::new(AtomicUsize::new(0)),
        };
        let handle = P2pHandle { local_node_id: node_id, outbound_tx, inbound_rx };
        (network, handle)
    }

    /// A shared counter of currently-connected peers, readable from
    /// `nxf_getNetworkInfo` without routing through the outbound/inbound
    /// channels.
    pub fn peer_count_handle(&self) -> Arc<AtomicUsize> {
        self.peer_count.clone()
    }

    /// Drive the network: accept inbound connections, dial configured
    /// bootstrap peers, and service the outbound queue. Runs until the
    /// process exits; callers spawn this as its own task.
    pub async fn run(mut self) {
        let listen_addr: SocketAddr = match self.config.listen_addr.parse() {
            Ok(addr) => addr,
            Err(e) => {
                warn!(error = %e, addr = %self.config.listen_addr, "invalid p2p listen address");
                return;
            }
        };

        let local = Arc::new(LocalInfo {
            node_id: self.node_id.clone(),
            public_key_hex: self.public_key_hex.clone(),
            listen_port: listen_addr.port(),
            protocol_version: self.config.protocol_version,
        });

        let listener = match TcpListener::bind(listen_addr).await {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, addr = %listen_addr, "failed to bind p2p listener");
                return;
            }
        };
        info!(addr = %listen_addr, "p2p listening");

        let registry = self.registry.clone();
        let inbound_tx = self.inbound_tx.clone();
        let seen_tx = self.seen_tx.clone();
        let seen_proposal = self.seen_proposal.clone();
        let peer_count = self.peer_count.clone();
        let accept_local = local.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        let registry = registry.clone();
                        let inbound_tx = inbound_tx.clone();
                        let seen_tx = seen_tx.clone();
                        let seen_proposal = seen_proposal.clone();
                        let peer_count = peer_count.clone();
                        let local = accept_local.clone();
                        tokio::spawn(async move {
                            run_connection(stream, remote, local, registry, inbound_tx, seen_tx, seen_proposal, peer_count).await;
                        });
                    }
                    Err(e) => warn!(error = %e, "p2p accept failed"),
                }
            }
        });

        for peer_addr in self.config.bootstrap_peers.clone() {
            let registry = self.registry.clone();
            let inbound_tx = self.inbound_tx.clone();
            let seen_tx = self.seen_tx.clone();
            let seen_proposal = self.seen_proposal.clone();
            let peer_count = self.peer_count.clone();
            let local = local.clone();
            tokio::spawn(async move {
                connect_to_peer(peer_addr, local, registry, inbound_tx, seen_tx, seen_proposal, peer_count).await;
            });
        }

        while let Some(event) = self.outbound_rx.recv().await {
            let registry = self.registry.lock().await;
            match event {
                Outbound::Broadcast { exclude, message } => {
                    for (peer, handle) in registry.iter() {
                        if exclude.as_deref() == Some(peer.as_str()) {
                            continue;
                        }
                        let _ = handle.tx.send(message.clone());
                    }
                }
                Outbound::SendTo { peer, message } => {
                    if let Some(handle) = registry.get(&peer) {
                        let _ = handle.tx.send(message);
                    } else {
                        debug!(peer = %peer, "send_to: peer not connected");
                    }
                }
            }
        }
    }
}

async fn connect_to_peer(
    addr: String,
    local: Arc<LocalInfo>,
    registry: Registry,
    inbound_tx: mpsc::Sender<Inbound>,
    seen_tx: Arc<Mutex<SeenCache<TxId>>>,
    seen_proposal: Arc<Mutex<SeenCache<[u8; 32]>>>,
    peer_count: Arc<AtomicUsize>,
) {
    if !is_connectable_peer_addr(&addr) {
        debug!(addr = %addr, "refusing to dial non-global peer address");
        return;
    }
    match TcpStream::connect(&addr).await {
        Ok(stream) => {
            let remote = stream.peer_addr().ok();
            info!(addr = %addr, "connected to peer");
            if let Some(remote) = remote {
                run_connection(stream, remote, local, registry, inbound_tx, seen_tx, seen_proposal, peer_count).await;
            }
        }
        Err(e) => warn!(addr = %addr, error = %e, "failed to connect to peer"),
    }
}

/// Filters out loopback, unspecified, and private/link-local addresses
/// before they can be added to the connect-to list, per distilled §6.
pub fn is_connectable_peer_addr(addr: &str) -> bool {
    let Ok(socket) = addr.parse::<SocketAddr>() else { return false };
    is_global_like(socket.ip())
}

fn is_global_like(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => !(v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast()),
        IpAddr::V6(v6) => {
            let is_unique_local = (v6.segments()[0] & 0xfe00) == 0xfc00;
            let is_unicast_link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || is_unique_local || is_unicast_link_local)
        }
    }
}

async fn run_connection(
    stream: TcpStream,
    remote: SocketAddr,
    local: Arc<LocalInfo>,
    registry: Registry,
    inbound_tx: mpsc::Sender<Inbound>,
    seen_tx: Arc<Mutex<SeenCache<TxId>>>,
    seen_proposal: Arc<Mutex<SeenCache<[u8; 32]>>>,
    peer_count: Arc<AtomicUsize>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half).lines();

    let hello = P2pMessage::Hello {
        node_id: local.node_id.clone(),
        port: local.listen_port,
        public_key_hex: local.public_key_hex.clone(),
        protocol_version: local.protocol_version,
    };
    let Ok(hello_line) = hello.to_line() else { return };
    if write_half.write_all(hello_line.as_bytes()).await.is_err() {
        return;
    }

    let peer_node_id = match reader.next_line().await {
        Ok(Some(line)) => match serde_json::from_str::<P2pMessage>(&line) {
            Ok(P2pMessage::Hello { node_id, protocol_version, .. }) => {
                if protocol_version != local.protocol_version {
                    warn!(peer = %node_id, "dropping peer with mismatched protocol version");
                    return;
                }
                node_id
            }
            _ => {
                debug!(remote = %remote, "first line from peer was not HELLO");
                return;
            }
        },
        _ => return,
    };

    if peer_node_id == local.node_id {
        debug!("dropping self-connection");
        return;
    }

    let (peer_tx, mut peer_rx) = mpsc::unbounded_channel::<P2pMessage>();
    registry.lock().await.insert(peer_node_id.clone(), PeerHandle { tx: peer_tx });
    peer_count.fetch_add(1, Ordering::SeqCst);
    info!(peer = %peer_node_id, %remote, "peer registered");

    let writer_task = tokio::spawn(async move {
        while let Some(message) = peer_rx.recv().await {
            match message.to_line() {
                Ok(line) => {
                    if write_half.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "failed to encode outbound message"),
            }
        }
    });

    loop {
        match reader.next_line().await {
            Ok(Some(line)) => {
                let message = match serde_json::from_str::<P2pMessage>(&line) {
                    Ok(m) => m,
                    Err(e) => {
                        debug!(error = %e, peer = %peer_node_id, "dropping malformed p2p message");
                        continue;
                    }
                };
                handle_message(
                    message,
                    &peer_node_id,
                    &local,
                    &registry,
                    &inbound_tx,
                    &seen_tx,
                    &seen_proposal,
                    &peer_count,
                )
                .await;
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, peer = %peer_node_id, "p2p read error");
                break;
            }
        }
    }

    registry.lock().await.remove(&peer_node_id);
    peer_count.fetch_sub(1, Ordering::SeqCst);
    writer_task.abort();
    info!(peer = %peer_node_id, "peer disconnected");
}

async fn handle_message(
    message: P2pMessage,
    from: &str,
    local: &LocalInfo,
    registry: &Registry,
    inbound_tx: &mpsc::Sender<Inbound>,
    seen_tx: &Arc<Mutex<SeenCache<TxId>>>,
    seen_proposal: &Arc<Mutex<SeenCache<[u8; 32]>>>,
    peer_count: &Arc<AtomicUsize>,
) {
    match message {
        P2pMessage::Hello { .. } => {}
        P2pMessage::Peers { addresses } => {
            let known = registry.lock().await;
            let already_known: Vec<String> = known.keys().cloned().collect();
            drop(known);
            for addr in addresses {
                if !is_connectable_peer_addr(&addr) {
                    continue;
                }
                if already_known.iter().any(|k| k == &addr) {
                    continue;
                }
                // Best-effort: dial opportunistically, ignore failures.
                let registry = registry.clone();
                let inbound_tx = inbound_tx.clone();
                let local = Arc::new(LocalInfo {
                    node_id: local.node_id.clone(),
                    public_key_hex: local.public_key_hex.clone(),
                    listen_port: local.listen_port,
                    protocol_version: local.protocol_version,
                });
                let seen_tx = seen_tx.clone();
                let seen_proposal = seen_proposal.clone();
                let peer_count = peer_count.clone();
                tokio::spawn(async move {
                    connect_to_peer(addr, local, registry, inbound_tx, seen_tx, seen_proposal, peer_count).await;
                });
            }
        }
        P2pMessage::Tx { tx } => {
            let novel = !seen_tx.lock().await.insert_seen(tx.tx_id);
            if novel {
                let _ = inbound_tx.send(Inbound { from: from.to_string(), message: P2pMessage::Tx { tx: tx.clone() } }).await;
                gossip_except(registry, from, P2pMessage::Tx { tx }).await;
            }
        }
        P2pMessage::Proposal { proposal } => {
            let novel = !seen_proposal.lock().await.insert_seen(proposal.hash());
            if novel {
                let _ = inbound_tx
                    .send(Inbound { from: from.to_string(), message: P2pMessage::Proposal { proposal: proposal.clone() } })
                    .await;
                gossip_except(registry, from, P2pMessage::Proposal { proposal }).await;
            }
        }
        P2pMessage::Ping => {
            if let Some(handle) = registry.lock().await.get(from) {
                let _ = handle.tx.send(P2pMessage::Pong);
            }
        }
        other => {
            let _ = inbound_tx.send(Inbound { from: from.to_string(), message: other }).await;
        }
    }
}

async fn gossip_except(registry: &Registry, exclude: &str, message: P2pMessage) {
    let registry = registry.lock().await;
    for (peer, handle) in registry.iter() {
        if peer == exclude {
            continue;
        }
        let _ = handle.tx.send(message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_and_private_addresses_are_rejected() {
        assert!(!is_connectable_peer_addr("127.0.0.1:7777"));
        assert!(!is_connectable_peer_addr("10.0.0.5:7777"));
        assert!(!is_connectable_peer_addr("192.168.1.2:7777"));
        assert!(!is_connectable_peer_addr("169.254.1.2:7777"));
        assert!(!is_connectable_peer_addr("not-an-addr"));
    }

    #[test]
    fn public_address_is_accepted() {
        assert!(is_connectable_peer_addr("203.0.113.5:7777"));
    }
}
